//! # Port Selection
//!
//! Chooses one port out of several discovered candidates. The strategy is
//! injectable so the initializer can run without a terminal.

use std::io::{BufRead, Write};
use tracing::{info, warn};

use crate::error::{CaptureError, Result};

/// Picks an index into a list of discovered ports
pub trait PortSelector {
    /// Return the index of the chosen port in `ports`
    fn select(&mut self, ports: &[String]) -> Result<usize>;
}

/// Uses a pre-supplied index
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

impl PortSelector for FixedSelector {
    fn select(&mut self, _ports: &[String]) -> Result<usize> {
        Ok(self.0)
    }
}

/// Prints an indexed list and reads the choice from an input stream
///
/// Invalid or out-of-range answers re-prompt until a valid index is read
/// or the input is exhausted.
pub struct InteractiveSelector<R, W> {
    input: R,
    output: W,
}

impl InteractiveSelector<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Selector bound to the process's stdin and stdout
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> InteractiveSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the selector, returning its output stream
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> PortSelector for InteractiveSelector<R, W> {
    fn select(&mut self, ports: &[String]) -> Result<usize> {
        for (i, port) in ports.iter().enumerate() {
            writeln!(self.output, "  {}: {}", i, port)?;
        }

        loop {
            write!(self.output, "Select index: ")?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                return Err(CaptureError::Selection(
                    "input closed before a port was selected".to_string(),
                ));
            }

            match answer.trim().parse::<usize>() {
                Ok(idx) if idx < ports.len() => return Ok(idx),
                Ok(idx) => {
                    warn!("Selection {} out of range (0-{})", idx, ports.len() - 1);
                    writeln!(self.output, "Index must be between 0 and {}", ports.len() - 1)?;
                }
                Err(_) => {
                    warn!("Selection {:?} is not a number", answer.trim());
                    writeln!(self.output, "Enter a number between 0 and {}", ports.len() - 1)?;
                }
            }
        }
    }
}

/// How the session's port was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceSource {
    /// Static override from configuration
    Configured,
    /// The only port discovery found
    AutoSelected,
    /// Picked by a [`PortSelector`] among several
    Selected,
}

/// Port the session connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortChoice {
    pub port: String,
    pub source: ChoiceSource,
}

/// Resolve which port the session connects to
///
/// # Arguments
///
/// * `configured` - Static override; returned as-is without discovery
/// * `discover` - Port discovery, run only when no override is set
/// * `selector` - Consulted only when more than one port is found
///
/// # Errors
///
/// Returns error if:
/// - Discovery fails (unsupported platform)
/// - No ports are found
/// - The selector fails or returns an out-of-range index
pub fn choose_port<D, S>(configured: Option<&str>, discover: D, selector: &mut S) -> Result<PortChoice>
where
    D: FnOnce() -> Result<Vec<String>>,
    S: PortSelector + ?Sized,
{
    if let Some(port) = configured {
        info!("Using configured port {}", port);
        return Ok(PortChoice {
            port: port.to_string(),
            source: ChoiceSource::Configured,
        });
    }

    let mut ports = discover()?;

    match ports.len() {
        0 => Err(CaptureError::NoPortsFound),
        1 => {
            let port = ports.remove(0);
            info!("Auto-selected {}", port);
            Ok(PortChoice {
                port,
                source: ChoiceSource::AutoSelected,
            })
        }
        count => {
            let idx = selector.select(&ports)?;
            if idx >= count {
                return Err(CaptureError::Selection(format!(
                    "index {} out of range for {} ports",
                    idx, count
                )));
            }
            let port = ports.swap_remove(idx);
            info!("Selected {}", port);
            Ok(PortChoice {
                port,
                source: ChoiceSource::Selected,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio_test::{assert_err, assert_ok};

    fn ports(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Selector that fails the test if it is ever consulted
    struct NeverSelector;

    impl PortSelector for NeverSelector {
        fn select(&mut self, ports: &[String]) -> Result<usize> {
            panic!("selector consulted for {:?}", ports);
        }
    }

    #[test]
    fn test_configured_port_skips_discovery() {
        let port = choose_port(
            Some("/dev/ttyUSB7"),
            || panic!("discovery should not run"),
            &mut NeverSelector,
        );
        let choice = assert_ok!(port);
        assert_eq!(choice.port, "/dev/ttyUSB7");
        assert_eq!(choice.source, ChoiceSource::Configured);
    }

    #[test]
    fn test_no_ports_found() {
        let result = choose_port(None, || Ok(Vec::new()), &mut NeverSelector);
        assert!(matches!(result, Err(CaptureError::NoPortsFound)));
    }

    #[test]
    fn test_single_port_auto_selected() {
        let result = choose_port(None, || Ok(ports(&["/dev/ttyACM0"])), &mut NeverSelector);
        let choice = assert_ok!(result);
        assert_eq!(choice.port, "/dev/ttyACM0");
        assert_eq!(choice.source, ChoiceSource::AutoSelected);
    }

    #[test]
    fn test_discovery_error_propagates() {
        let result = choose_port(
            None,
            || Err(CaptureError::UnsupportedPlatform("haiku".to_string())),
            &mut NeverSelector,
        );
        assert!(matches!(result, Err(CaptureError::UnsupportedPlatform(_))));
    }

    #[test]
    fn test_fixed_selector_picks_index() {
        let result = choose_port(
            None,
            || Ok(ports(&["/dev/ttyACM0", "/dev/ttyUSB0", "/dev/ttyUSB1"])),
            &mut FixedSelector(1),
        );
        assert_eq!(assert_ok!(result).port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_fixed_selector_out_of_range() {
        let result = choose_port(
            None,
            || Ok(ports(&["/dev/ttyACM0", "/dev/ttyUSB0"])),
            &mut FixedSelector(2),
        );
        match assert_err!(result) {
            CaptureError::Selection(msg) => assert!(msg.contains("out of range")),
            other => panic!("Expected Selection error, got: {:?}", other),
        }
    }

    #[test]
    fn test_interactive_lists_ports_and_reads_index() {
        let mut selector = InteractiveSelector::new(Cursor::new("1\n"), Vec::new());
        let idx = selector.select(&ports(&["COM3", "COM4"])).unwrap();
        assert_eq!(idx, 1);

        let printed = String::from_utf8(selector.into_output()).unwrap();
        assert_eq!(printed, "  0: COM3\n  1: COM4\nSelect index: ");
    }

    #[test]
    fn test_interactive_reprompts_on_bad_input() {
        let mut selector = InteractiveSelector::new(Cursor::new("abc\n7\n-1\n 0 \n"), Vec::new());
        let idx = selector.select(&ports(&["COM3", "COM4"])).unwrap();
        assert_eq!(idx, 0);

        let printed = String::from_utf8(selector.into_output()).unwrap();
        assert_eq!(printed.matches("Select index: ").count(), 4);
        assert!(printed.contains("Index must be between 0 and 1"));
    }

    #[test]
    fn test_interactive_closed_input() {
        let mut selector = InteractiveSelector::new(Cursor::new("9\n"), Vec::new());
        let result = selector.select(&ports(&["COM3", "COM4"]));
        assert!(matches!(result, Err(CaptureError::Selection(_))));
    }

    #[test]
    fn test_interactive_through_choose_port() {
        let mut selector = InteractiveSelector::new(Cursor::new("2\n"), Vec::new());
        let result = choose_port(
            None,
            || Ok(ports(&["/dev/ttyS0", "/dev/ttyS1", "/dev/ttyUSB0"])),
            &mut selector,
        );
        assert_eq!(assert_ok!(result).port, "/dev/ttyUSB0");
    }
}
