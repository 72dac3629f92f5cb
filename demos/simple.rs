use charts_core::{apply_edits, format, validate, FormattingOptions};

fn main() {
    let config = r#"
[widget]
type = chart
timespn = 1 hour
[series]
entity = nurswgvml007
"#;

    match validate(config, "example.config") {
        Ok(report) => {
            println!("{}", report.render());
            let json_output = report.to_json().unwrap();
            println!("Diagnostics as JSON:\n{json_output}");
        }
        Err(e) => {
            eprintln!("Failed to validate: {e:?}");
        }
    }

    match format(config, &FormattingOptions::default()) {
        Ok(edits) => println!("Formatted:\n{}", apply_edits(config, &edits)),
        Err(e) => eprintln!("Failed to format: {e:?}"),
    }
}
