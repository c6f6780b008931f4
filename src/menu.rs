//! Interactive port (and baud rate) selection.

use std::io::{BufRead, Write};

use crate::error::{KmError, KmResult};
use crate::interface::PortDescriptor;

fn console_err(e: std::io::Error) -> KmError {
    KmError::Input(format!("Console I/O failed: {}", e))
}

/// Print `prompt` and read one menu number
pub fn read_index<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> KmResult<usize> {
    write!(out, "{}", prompt)
        .and_then(|_| out.flush())
        .map_err(console_err)?;

    let mut line = String::new();
    if input.read_line(&mut line).map_err(console_err)? == 0 {
        return Err(KmError::Input("No selection entered".to_owned()));
    }
    let answer = line.trim();
    answer
        .parse()
        .map_err(|_| KmError::Selection(format!("'{}' is not a menu number", answer)))
}

/// Fail startup, telling the user, when there is nothing to choose from
pub fn ensure_ports<W: Write>(out: &mut W, ports: &[PortDescriptor]) -> KmResult<()> {
    if ports.is_empty() {
        writeln!(out, "No COM ports found.").map_err(console_err)?;
        return Err(KmError::Configuration("No COM ports found".to_owned()));
    }
    Ok(())
}

pub fn print_port_menu<W: Write>(out: &mut W, ports: &[PortDescriptor]) -> KmResult<()> {
    for (i, port) in ports.iter().enumerate() {
        writeln!(out, "{}: {}", i, port).map_err(console_err)?;
    }
    Ok(())
}

pub fn select_port(ports: &[PortDescriptor], index: usize) -> KmResult<&PortDescriptor> {
    ports.get(index).ok_or_else(|| {
        KmError::Selection(format!(
            "Port {} does not exist, choose 0..{}",
            index,
            ports.len()
        ))
    })
}

/// Every port offered at every candidate rate. Entry `i` is port
/// `i / rates.len()` at rate `rates[i % rates.len()]`.
pub struct BaudMenu<'a> {
    ports: &'a [PortDescriptor],
    rates: &'a [u32],
}

impl<'a> BaudMenu<'a> {
    pub fn new(ports: &'a [PortDescriptor], rates: &'a [u32]) -> Self {
        BaudMenu { ports, rates }
    }

    pub fn len(&self) -> usize {
        self.ports.len() * self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = (usize, &'a PortDescriptor, u32)> + '_ {
        self.ports.iter().enumerate().flat_map(move |(i, port)| {
            self.rates
                .iter()
                .enumerate()
                .map(move |(j, rate)| (i * self.rates.len() + j, port, *rate))
        })
    }

    pub fn print<W: Write>(&self, out: &mut W) -> KmResult<()> {
        for (index, port, rate) in self.entries() {
            writeln!(out, "{}: {} ({})", index, port.name, rate).map_err(console_err)?;
        }
        Ok(())
    }

    pub fn resolve(&self, index: usize) -> KmResult<(&'a PortDescriptor, u32)> {
        if self.rates.is_empty() {
            return Err(KmError::Configuration("No candidate baud rates".to_owned()));
        }
        let port = self.ports.get(index / self.rates.len()).ok_or_else(|| {
            KmError::Selection(format!(
                "Entry {} does not exist, choose 0..{}",
                index,
                self.len()
            ))
        })?;
        Ok((port, self.rates[index % self.rates.len()]))
    }
}
