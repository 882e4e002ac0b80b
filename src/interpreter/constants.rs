//! Command-language constants and byte helpers

/// Integer type of the command language: signed 64-bit with wraparound.
pub type TecoInt = i64;

/// Condition booleans: negative means success/truth.
pub const SUCCESS: TecoInt = -1;
pub const FAILURE: TecoInt = 0;

/// The default string terminator and the name of the command-line register.
pub const ESCAPE: u8 = 0x1B;
pub const ESCAPE_NAME: &str = "\u{1b}";

/// Name of the global search register consulted by `;`.
pub const SEARCH_REG: &str = "_";

/// Default ED flags: automatic EOL translation only.
pub const ED_DEFAULT: TecoInt = 16;
/// ED flag enabling buffer edit hooks.
pub const ED_HOOKS: TecoInt = 32;

/// Default memory limit in bytes (0 disables the check).
pub const MEMORY_LIMIT_DEFAULT: usize = 500 * 1024 * 1024;

pub fn teco_bool(b: bool) -> TecoInt {
    if b {
        SUCCESS
    } else {
        FAILURE
    }
}

pub fn is_failure(b: TecoInt) -> bool {
    b >= 0
}

pub fn is_success(b: TecoInt) -> bool {
    b < 0
}

/// The control-key form of a character: `ctl(b'C')` is `^C`.
pub fn ctl(c: u8) -> u8 {
    c & 0x1F
}

pub fn is_ctl(c: u8) -> bool {
    c < 0x20
}

/// Printable echo of a control code: `ctl_echo(3)` is `b'C'`.
pub fn ctl_echo(c: u8) -> u8 {
    c | 0x40
}

pub fn to_upper(c: u8) -> u8 {
    c.to_ascii_uppercase()
}
