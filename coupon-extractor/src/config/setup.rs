//! Interactive first-run setup.

use std::io::{BufRead, Write};

use crate::error::{ServiceError, ServiceResult};

use super::{ExtractorConfig, MAX_COUPONS_PER_PAGE, MIN_COUPONS_PER_PAGE};
use super::{default_convert_pdf, default_extract_images, default_setup_coupons_per_page};

/// Collects a configuration from the user when none is stored.
///
/// Returns `Ok(None)` when the user abandons setup.
pub trait SetupPrompt {
    fn collect(&mut self) -> ServiceResult<Option<ExtractorConfig>>;
}

/// Line-oriented setup over any reader/writer pair (stdin/stdout in the binary)
pub struct TerminalSetup<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalSetup<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print a prompt and read one trimmed line; `None` on end of input
    fn ask(&mut self, prompt: &str) -> ServiceResult<Option<String>> {
        write!(self.output, "{}", prompt).map_err(io_error)?;
        self.output.flush().map_err(io_error)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(io_error)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_bool(&mut self, prompt: &str, default: bool) -> ServiceResult<Option<bool>> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let Some(answer) = self.ask(&format!("{} [{}]: ", prompt, hint))? else {
                return Ok(None);
            };
            match answer.to_ascii_lowercase().as_str() {
                "" => return Ok(Some(default)),
                "y" | "yes" => return Ok(Some(true)),
                "n" | "no" => return Ok(Some(false)),
                _ => writeln!(self.output, "Please answer y or n.").map_err(io_error)?,
            }
        }
    }

    fn ask_coupons_per_page(&mut self) -> ServiceResult<Option<u8>> {
        let default = default_setup_coupons_per_page();
        loop {
            let prompt = format!(
                "Coupons per page ({}-{}) [{}]: ",
                MIN_COUPONS_PER_PAGE, MAX_COUPONS_PER_PAGE, default
            );
            let Some(answer) = self.ask(&prompt)? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(Some(default));
            }
            match answer.parse::<u8>() {
                Ok(n) if (MIN_COUPONS_PER_PAGE..=MAX_COUPONS_PER_PAGE).contains(&n) => {
                    return Ok(Some(n));
                }
                _ => writeln!(
                    self.output,
                    "Enter a number from {} to {}.",
                    MIN_COUPONS_PER_PAGE, MAX_COUPONS_PER_PAGE
                )
                .map_err(io_error)?,
            }
        }
    }
}

impl<R: BufRead, W: Write> SetupPrompt for TerminalSetup<R, W> {
    fn collect(&mut self) -> ServiceResult<Option<ExtractorConfig>> {
        writeln!(self.output, "Setup Configuration").map_err(io_error)?;

        let (source, destination) = loop {
            let Some(source) = self.ask("Source folder: ")? else {
                return Ok(None);
            };
            let Some(destination) = self.ask("Destination folder: ")? else {
                return Ok(None);
            };
            if source.is_empty() || destination.is_empty() {
                writeln!(
                    self.output,
                    "Both source and destination folders must be selected!"
                )
                .map_err(io_error)?;
                continue;
            }
            break (source, destination);
        };

        let mut config = ExtractorConfig::new(source, destination);

        macro_rules! answer {
            ($e:expr) => {
                match $e? {
                    Some(value) => value,
                    None => return Ok(None),
                }
            };
        }

        config.extract_images = answer!(
            self.ask_bool("Extract coupon images", default_extract_images())
        );
        config.convert_pdf = answer!(self.ask_bool("Create .PDF file(s)", default_convert_pdf()));
        config.merge_pdf = answer!(self.ask_bool("Combine multiple .FDF into single .PDF", false));
        config.delete_fdf = answer!(self.ask_bool("Delete .FDF file(s) after processing", false));
        config.suppress_messages =
            answer!(self.ask_bool("Hide successful completion message", false));
        config.coupons_per_page = answer!(self.ask_coupons_per_page());

        Ok(Some(config))
    }
}

fn io_error(e: std::io::Error) -> ServiceError {
    ServiceError::Config {
        message: format!("Setup I/O failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn run(script: &str) -> (Option<ExtractorConfig>, String) {
        let mut output = Vec::new();
        let result = {
            let mut setup = TerminalSetup::new(Cursor::new(script.as_bytes()), &mut output);
            setup.collect().unwrap()
        };
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_defaults_accepted() {
        let (config, _) = run("/in\n/out\n\n\n\n\n\n\n");
        let config = config.unwrap();

        assert_eq!(config.source_dir, PathBuf::from("/in"));
        assert_eq!(config.destination_dir, PathBuf::from("/out"));
        assert!(config.extract_images);
        assert!(config.convert_pdf);
        assert!(!config.merge_pdf);
        assert!(!config.delete_fdf);
        assert!(!config.suppress_messages);
        assert_eq!(config.coupons_per_page, 4);
    }

    #[test]
    fn test_empty_folder_reprompts() {
        let (config, output) = run("\n/out\n/in\n/out\nn\ny\ny\nn\ny\n2\n");
        let config = config.unwrap();

        assert!(output.contains("Both source and destination folders must be selected!"));
        assert_eq!(config.source_dir, PathBuf::from("/in"));
        assert!(!config.extract_images);
        assert!(config.convert_pdf);
        assert!(config.merge_pdf);
        assert!(!config.delete_fdf);
        assert!(config.suppress_messages);
        assert_eq!(config.coupons_per_page, 2);
    }

    #[test]
    fn test_out_of_range_coupons_reprompts() {
        let (config, output) = run("/in\n/out\n\n\n\n\n\n7\n5\n");
        assert!(output.contains("Enter a number from 1 to 5."));
        assert_eq!(config.unwrap().coupons_per_page, 5);
    }

    #[test]
    fn test_end_of_input_abandons_setup() {
        let (config, _) = run("/in\n");
        assert!(config.is_none());
    }
}
