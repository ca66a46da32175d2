use serde::Serialize;

use crate::cmd::{load_registry, RegistryArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, table, OutputFormat};

#[derive(Debug, Serialize)]
struct RegistryOutput {
    version: Option<String>,
    fingerprint: String,
    descriptors: Vec<DescriptorOutput>,
}

#[derive(Debug, Serialize)]
struct DescriptorOutput {
    code: u8,
    name: String,
}

pub fn run(args: RegistryArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = load_registry(&args.path)?;
    let out = RegistryOutput {
        version: registry.version().map(str::to_string),
        fingerprint: format!("{:08x}", registry.fingerprint()),
        descriptors: registry
            .iter()
            .map(|(code, name)| DescriptorOutput {
                code,
                name: name.to_string(),
            })
            .collect(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = table(vec!["CODE", "DESCRIPTOR"]);
            for descriptor in &out.descriptors {
                table.add_row(vec![descriptor.code.to_string(), descriptor.name.clone()]);
            }
            println!("{table}");
            println!(
                "version: {}  fingerprint: {}",
                out.version.as_deref().unwrap_or("-"),
                out.fingerprint
            );
        }
        OutputFormat::Pretty => {
            println!("version: {}", out.version.as_deref().unwrap_or("-"));
            println!("fingerprint: {}", out.fingerprint);
            for descriptor in &out.descriptors {
                println!("{:>3} {}", descriptor.code, descriptor.name);
            }
        }
    }
    Ok(SUCCESS)
}
