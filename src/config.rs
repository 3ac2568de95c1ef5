use fugit::{ExtU32, MillisDurationU32};

/// Command timeouts
///
/// Defaults fit a SIM800/Quectel class module at 9600 baud. Message submission is by far the slowest
/// step, as the module waits for the network to accept the message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModemConfig {
    /// Default timeout of [crate::sms::Modem::send_command]
    pub command_timeout: MillisDurationU32,

    /// `AT` liveness check
    pub liveness_timeout: MillisDurationU32,

    /// `AT+QPOWD` power down
    pub power_down_timeout: MillisDurationU32,

    /// `AT+CMGF=1` text mode
    pub text_mode_timeout: MillisDurationU32,

    /// `AT+CMGS` until the body prompt shows up
    pub prompt_timeout: MillisDurationU32,

    /// Message body until the submission is confirmed
    pub submit_timeout: MillisDurationU32,

    /// `AT+CREG?` until OK
    pub registration_timeout: MillisDurationU32,

    /// Collection window after the registration query
    pub registration_window: MillisDurationU32,

    /// `AT+CMGR` until the message header shows up
    pub read_timeout: MillisDurationU32,

    /// Collection window for the message record
    pub read_window: MillisDurationU32,

    /// `AT+CMGD`
    pub delete_timeout: MillisDurationU32,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            command_timeout: 2_000.millis(),
            liveness_timeout: 1_000.millis(),
            power_down_timeout: 3_000.millis(),
            text_mode_timeout: 1_000.millis(),
            prompt_timeout: 1_000.millis(),
            submit_timeout: 5_000.millis(),
            registration_timeout: 1_000.millis(),
            registration_window: 1_000.millis(),
            read_timeout: 3_000.millis(),
            read_window: 3_000.millis(),
            delete_timeout: 2_000.millis(),
        }
    }
}

impl ModemConfig {
    /// Sets the timeout for message submission in ms
    pub fn set_submit_timeout_ms(&mut self, timeout: u32) {
        self.submit_timeout = MillisDurationU32::millis(timeout);
    }

    /// Sets the default command timeout in ms
    pub fn set_command_timeout_ms(&mut self, timeout: u32) {
        self.command_timeout = MillisDurationU32::millis(timeout);
    }
}
