use colored::{ColoredString, Colorize};

use crate::annotation::connection::NspTransport;
use crate::annotation::marker::MarkerColor;

/// Prints markers to the terminal in their NSP colour instead of sending
/// them anywhere. Used for dry runs away from the rig.
#[derive(Debug, Default)]
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }
}

fn paint(text: &str, color: MarkerColor) -> ColoredString {
    match color {
        MarkerColor::Green => text.green(),
        MarkerColor::Pink => text.magenta(),
        MarkerColor::Red => text.red(),
        MarkerColor::Blue => text.blue(),
        MarkerColor::White => text.white(),
    }
}

impl NspTransport for ConsoleTransport {
    fn open(&mut self, device: usize, address: &str) -> Result<(), String> {
        println!("{}", format!("NSP-{} open ({})", device + 1, address).as_str().dimmed());
        Ok(())
    }

    fn set_comment(
        &mut self,
        device: usize,
        comment: &str,
        color: MarkerColor,
    ) -> Result<(), String> {
        println!("NSP-{} {}", device + 1, paint(comment, color));
        Ok(())
    }

    fn close(&mut self, device: usize) -> Result<(), String> {
        println!("{}", format!("NSP-{} close", device + 1).as_str().dimmed());
        Ok(())
    }
}
