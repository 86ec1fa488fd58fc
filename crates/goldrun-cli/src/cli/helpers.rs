use super::CliError;
use goldrun_core::domain::HarnessError;
use std::io::{BufRead, Write};
use std::path::PathBuf;

pub(super) fn current_working_dir() -> Result<PathBuf, CliError> {
    std::env::current_dir().map_err(|source| {
        CliError::Harness(HarnessError::io_system(
            "IO.CLI_CURRENT_DIR",
            format!("failed to read current working directory: {}", source),
        ))
    })
}

/// Writes `prompt` and reads one line. Only `y`/`yes` (any case) count as a
/// yes; end of input counts as a no.
pub(super) fn confirm<R, W>(prompt: &str, reader: &mut R, writer: &mut W) -> std::io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    write!(writer, "{prompt}")?;
    writer.flush()?;

    let mut answer = String::new();
    if reader.read_line(&mut answer)? == 0 {
        writeln!(writer)?;
        return Ok(false);
    }
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
