//! Common regex patterns for auction invoice processing.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Date patterns
    pub static ref DATE_ISO: Regex = Regex::new(
        r"^\d{4}-\d{2}-\d{2}$"
    ).unwrap();

    pub static ref DATE_DMY: Regex = Regex::new(
        r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2,4})$"
    ).unwrap();

    // Ancillary services charged on top of hammer price and premium
    pub static ref ANCILLARY_SERVICE: Regex = Regex::new(
        r"(?i)\b(?:postage|post\s*&\s*packing|p\s*&\s*p|packing|packaging|shipping|delivery|courier|insurance|live[\s\-]*bid(?:ding)?|internet\s+(?:bidding|surcharge)|handling|storage|admin(?:istration)?\s+fee)\b"
    ).unwrap();

    // Error text used by the retry classifier
    pub static ref AUTH_FAILURE: Regex = Regex::new(
        r"(?i)unauthori[sz]ed|unauthenticated|authentication|invalid[\s_]+(?:api[\s_]+key|token|credentials?|grant)|api[\s_]+key|credential|expired[\s_]+token|token[\s_]+expired|permission[\s_]+denied"
    ).unwrap();

    pub static ref RATE_LIMIT: Regex = Regex::new(
        r"(?i)rate[\s_\-]*limit|too[\s_]+many[\s_]+requests|quota|resource[\s_]+exhausted"
    ).unwrap();

    pub static ref NETWORK_FAILURE: Regex = Regex::new(
        r"(?i)timed?[\s_\-]*out|timeout|connection[\s_]+(?:reset|refused|closed|aborted)|socket[\s_]+hang[\s_]+up|dns|getaddrinfo|name[\s_]+resolution|network|econnreset|econnrefused|etimedout|enotfound|eai_again|epipe"
    ).unwrap();

    pub static ref INVALID_INPUT: Regex = Regex::new(
        r"(?i)unsupported[\s_]+(?:file|media|mime|image|document|format|content)|invalid[\s_]+(?:file|mime|media)[\s_]+type|unsupported_media_type"
    ).unwrap();

    pub static ref POLICY_REJECTION: Regex = Regex::new(
        r"(?i)safety|content[\s_]+(?:policy|filter)|blocked[\s_]+(?:by|due)|recitation|prohibited[\s_]+content"
    ).unwrap();

    pub static ref SERVICE_UNAVAILABLE: Regex = Regex::new(
        r"(?i)unavailable|overloaded|bad[\s_]+gateway"
    ).unwrap();
}
