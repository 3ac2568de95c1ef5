use crate::config::ModemConfig;
use crate::engine::Command;
use heapless::Vec;
use numtoa::NumToA;

/// Response to a successfully executed command
pub const OK: &[u8] = b"OK";

/// Prompt for entering the message body
pub const PROMPT: &[u8] = b">";

/// Header of a read message
pub const READ_HEADER: &[u8] = b"+CMGR:";

/// Header of the network registration response
pub const REGISTRATION_HEADER: &[u8] = b"+CREG:";

/// Ctrl+Z, terminates the message body and submits the message
pub const SUBMIT: u8 = 0x1A;

/// Max. length of a formatted command line
pub const COMMAND_LINE_SIZE: usize = 64;

/// Formatted command line with arguments
pub type CommandLine = Vec<u8, COMMAND_LINE_SIZE>;

const RECIPIENT_PREFIX: &[u8] = b"AT+CMGS=\"";
const READ_PREFIX: &[u8] = b"AT+CMGR=";
const DELETE_PREFIX: &[u8] = b"AT+CMGD=";

/// Liveness check
pub fn liveness(config: &ModemConfig) -> Command<'static> {
    Command::new(b"AT", OK, config.liveness_timeout)
}

/// Powers down the module
pub fn power_down(config: &ModemConfig) -> Command<'static> {
    Command::new(b"AT+QPOWD", OK, config.power_down_timeout)
}

/// Switches to SMS text mode
pub fn text_mode(config: &ModemConfig) -> Command<'static> {
    Command::new(b"AT+CMGF=1", OK, config.text_mode_timeout)
}

/// Starts a message to the recipient, completed by the body prompt
pub fn recipient<'a>(line: &'a CommandLine, config: &ModemConfig) -> Command<'a> {
    Command::new(line, PROMPT, config.prompt_timeout)
}

/// Waits for the confirmation of the submitted message
pub fn submit(config: &ModemConfig) -> Command<'static> {
    Command::listen(OK, config.submit_timeout)
}

/// Queries the network registration state
pub fn registration_query(config: &ModemConfig) -> Command<'static> {
    Command::new(b"AT+CREG?", OK, config.registration_timeout)
}

/// Reads the message, completed as soon as the message header arrives
pub fn read_message<'a>(line: &'a CommandLine, config: &ModemConfig) -> Command<'a> {
    Command::new(line, READ_HEADER, config.read_timeout)
}

/// Deletes the message
pub fn delete_message<'a>(line: &'a CommandLine, config: &ModemConfig) -> Command<'a> {
    Command::new(line, OK, config.delete_timeout)
}

/// Formats `AT+CMGS="<address>"`. Returns None if the address does not fit.
pub fn recipient_line(address: &str) -> Option<CommandLine> {
    let mut line = CommandLine::new();
    line.extend_from_slice(RECIPIENT_PREFIX).ok()?;
    line.extend_from_slice(address.as_bytes()).ok()?;
    line.push(b'"').ok()?;
    Some(line)
}

/// Formats `AT+CMGR=<index>`
pub fn read_line(index: u16) -> CommandLine {
    indexed_line(READ_PREFIX, index)
}

/// Formats `AT+CMGD=<index>`
pub fn delete_line(index: u16) -> CommandLine {
    indexed_line(DELETE_PREFIX, index)
}

fn indexed_line(prefix: &[u8], index: u16) -> CommandLine {
    let mut digits = [0x0; 8];
    let mut line = CommandLine::new();

    // Prefix + max. 5 digits always fit
    let _ = line.extend_from_slice(prefix);
    let _ = line.extend_from_slice(index.numtoa(10, &mut digits));
    line
}
