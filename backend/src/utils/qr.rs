//! Token-to-URL mapping consumed by the QR image encoder.
//!
//! Image encoding itself lives outside this crate; handlers only hand the
//! rendering layer a URL that a scanned phone will open.

pub fn scan_url(base_url: &str, token: &str) -> String {
    format!("{}/student?token={}", base_url.trim_end_matches('/'), token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_url_embeds_token() {
        assert_eq!(
            scan_url("http://10.0.0.5:3000", "123456"),
            "http://10.0.0.5:3000/student?token=123456"
        );
    }

    #[test]
    fn trailing_slash_is_not_doubled() {
        assert_eq!(
            scan_url("https://rollcall.example/", "654321"),
            "https://rollcall.example/student?token=654321"
        );
    }
}
