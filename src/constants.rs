use std::time::Duration;

pub const HARNESS_BAUD_RATE: u32 = 115200;
pub const HARNESS_READ_TIMEOUT: Duration = Duration::from_millis(1000);

pub const LOGGER_BAUD_RATES: [u32; 5] = [115200, 230400, 345600, 460800, 4000000];
pub const LOGGER_READ_TIMEOUT: Duration = Duration::ZERO;
pub const LOG_FILE_NAME: &str = "log.txt";

pub const MOVE_STEP: i32 = 10;

pub(crate) const MAX_READ_SIZE: usize = 1024;
pub(crate) const READER_IDLE_SLEEP_MICROS: u64 = 1000;
pub(crate) const PARTIAL_LINE_TIMEOUT: Duration = Duration::from_millis(500);
pub(crate) const MAX_PENDING_LINE: usize = 8 * MAX_READ_SIZE;

pub const IDLE_SLEEP: Duration = Duration::from_millis(10);
pub const KEY_QUEUE_CAPACITY: usize = 64;
