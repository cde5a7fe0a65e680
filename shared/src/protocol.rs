/// DNS-SD service label used for Minecraft SRV discovery
pub const SRV_SERVICE: &str = "_minecraft._tcp";

/// Default ports applied when an address carries none
pub const DEFAULT_JAVA_PORT: u16 = 25565;
pub const DEFAULT_BEDROCK_PORT: u16 = 19132;

/// Section sign that introduces a legacy formatting code
pub const FORMAT_CHAR: char = '\u{00A7}';

/// Prefix of the data URI a server icon is returned in
pub const ICON_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Path segment browsers probe for; never treated as a server address
pub const FAVICON_PROBE: &str = "favicon.ico";
