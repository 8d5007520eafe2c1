use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use flowfile_codec::{Attributes, FlowFile, FlowFileV3, FlowFileWriter};

use crate::cmd::PackArgs;
use crate::exit::{flowfile_error, io_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: PackArgs) -> CliResult<i32> {
    let attributes = parse_attributes(&args.attrs)?;
    let content = resolve_content(&args)?;
    let flowfile = FlowFileV3::new()
        .with_attributes(attributes)
        .with_content(content);

    match &args.output {
        Some(path) => {
            let file = open_output(path, args.append)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            write_package(file, &flowfile)?;
        }
        None => write_package(std::io::stdout().lock(), &flowfile)?,
    }

    tracing::info!(
        attributes = flowfile.attributes().len(),
        wire_size = flowfile.wire_size(),
        append = args.append,
        "packed flowfile"
    );
    Ok(SUCCESS)
}

fn write_package<W: Write>(sink: W, flowfile: &FlowFileV3) -> CliResult<()> {
    FlowFileWriter::new(sink)
        .write_flowfile(flowfile)
        .map_err(|err| flowfile_error("write failed", err))
}

fn open_output(path: &Path, append: bool) -> std::io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(path)
}

/// Parse `KEY=VALUE` pairs. Later pairs override earlier ones with the same
/// key; the value may itself contain `=`.
fn parse_attributes(pairs: &[String]) -> CliResult<Attributes> {
    let mut attributes = Attributes::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            CliError::new(USAGE, format!("attribute must be KEY=VALUE: {pair}"))
        })?;
        if key.is_empty() {
            return Err(CliError::new(
                USAGE,
                format!("attribute key must not be empty: {pair}"),
            ));
        }
        attributes.insert(key.to_string().into(), value.to_string().into());
    }
    Ok(attributes)
}

fn resolve_content(args: &PackArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}
