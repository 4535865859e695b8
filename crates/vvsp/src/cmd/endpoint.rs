use serde::Serialize;
use vvsp_transport::{endpoint_letter, EndpointConfig};

use crate::cmd::EndpointArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct EndpointOutput {
    output: u32,
    letter: char,
    path: String,
}

pub fn run(args: EndpointArgs, endpoint: &EndpointConfig, format: OutputFormat) -> CliResult<i32> {
    let letter =
        endpoint_letter(args.output).map_err(|err| transport_error("invalid output", err))?;
    let path = endpoint
        .path_for(args.output)
        .map_err(|err| transport_error("invalid output", err))?;

    let out = EndpointOutput {
        output: args.output,
        letter,
        path: path.display().to_string(),
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Output {} ({}): {}", out.output, out.letter, out.path)
        }
        OutputFormat::Raw => println!("{}", out.path),
    }
    Ok(SUCCESS)
}
