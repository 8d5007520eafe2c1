use std::collections::HashSet;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flowfile_codec::{CodecConfig, FlowFile, FlowFileReader, FlowFileV3};

use crate::cmd::UnpackArgs;
use crate::exit::{flowfile_error, io_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

/// Attribute that names a record's content when extracting.
const FILENAME_ATTRIBUTE: &str = "filename";

pub fn run(args: UnpackArgs, format: OutputFormat) -> CliResult<i32> {
    let config = CodecConfig {
        max_content_size: args.max_content_size.unwrap_or(u64::MAX),
        ..CodecConfig::default()
    };

    if let Some(dir) = &args.extract {
        fs::create_dir_all(dir)
            .map_err(|err| io_error(&format!("failed creating {}", dir.display()), err))?;
    }

    let records = if args.input.as_os_str() == "-" {
        unpack_stream(std::io::stdin().lock(), config, &args, format)?
    } else {
        let file = fs::File::open(&args.input).map_err(|err| {
            io_error(&format!("failed opening {}", args.input.display()), err)
        })?;
        unpack_stream(BufReader::new(file), config, &args, format)?
    };

    tracing::info!(records, "unpacked flowfile package");
    Ok(SUCCESS)
}

fn unpack_stream<R: Read>(
    src: R,
    config: CodecConfig,
    args: &UnpackArgs,
    format: OutputFormat,
) -> CliResult<u64> {
    let mut reader = FlowFileReader::with_config(src, config);
    let mut used_names = HashSet::new();
    while let Some(flowfile) = reader
        .read_flowfile()
        .map_err(|err| flowfile_error("decode failed", err))?
    {
        let index = reader.records_read() - 1;
        let extracted = match &args.extract {
            Some(dir) => Some(extract(dir, index, &flowfile, &mut used_names)?),
            None => None,
        };
        let extracted = extracted.as_ref().map(|p| p.display().to_string());
        print_record(index, &flowfile, extracted.as_deref(), format)?;
    }
    Ok(reader.records_read())
}

fn extract(
    dir: &Path,
    index: u64,
    flowfile: &FlowFileV3,
    used_names: &mut HashSet<String>,
) -> CliResult<PathBuf> {
    let path = dir.join(extract_name(index, flowfile, used_names));
    fs::write(&path, flowfile.content())
        .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
    tracing::debug!(path = %path.display(), "extracted content");
    Ok(path)
}

/// Use the `filename` attribute when it is a bare file name, so a crafted
/// package cannot write outside the extraction directory. Names already
/// taken earlier in the same package fall back to the record index.
fn extract_name(index: u64, flowfile: &FlowFileV3, used_names: &mut HashSet<String>) -> String {
    let name = match flowfile.attribute_str(FILENAME_ATTRIBUTE) {
        Some(name) if is_plain_file_name(name) && !used_names.contains(name) => name.to_string(),
        _ => {
            let mut name = format!("{index}.bin");
            let mut suffix = 1u64;
            while used_names.contains(&name) {
                name = format!("{index}-{suffix}.bin");
                suffix += 1;
            }
            name
        }
    };
    used_names.insert(name.clone());
    name
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name)
}
