//! 从请求头解析设备信息

use std::sync::LazyLock;

use axum::http::HeaderMap;
use regex::Regex;

use super::model::DeviceInfo;

static MAC_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Mac OS X (\d+[._]\d+)").expect("valid regex"));
static ANDROID_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Android (\d+)").expect("valid regex"));

const UNKNOWN: &str = "Unknown";

/// User-Agent 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser: String,
    pub os: String,
    pub device: String,
}

fn detect_browser(ua: &str) -> &'static str {
    if ua.contains("Edg") {
        "Edge"
    } else if ua.contains("OPR") || ua.contains("Opera") {
        "Opera"
    } else if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") {
        "Safari"
    } else {
        UNKNOWN
    }
}

fn detect_os(ua: &str) -> String {
    if ua.contains("Windows NT 10.0") {
        "Windows 10/11".to_string()
    } else if ua.contains("Windows NT 6.3") {
        "Windows 8.1".to_string()
    } else if ua.contains("Windows NT 6.2") {
        "Windows 8".to_string()
    } else if ua.contains("Windows NT 6.1") {
        "Windows 7".to_string()
    } else if ua.contains("Windows") {
        "Windows".to_string()
    } else if ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iOS") {
        // iOS 的 UA 里也带有 "Mac OS X"，必须先判断
        "iOS".to_string()
    } else if ua.contains("Mac OS X") {
        match MAC_VERSION.captures(ua) {
            Some(caps) => format!("macOS {}", caps[1].replace('_', ".")),
            None => "macOS".to_string(),
        }
    } else if ua.contains("Android") {
        // Android 的 UA 里也带有 "Linux"
        match ANDROID_VERSION.captures(ua) {
            Some(caps) => format!("Android {}", &caps[1]),
            None => "Android".to_string(),
        }
    } else if ua.contains("Linux") {
        "Linux".to_string()
    } else {
        UNKNOWN.to_string()
    }
}

fn detect_device(ua: &str) -> &'static str {
    if ua.contains("iPad") || ua.contains("Tablet") {
        "Tablet"
    } else if ua.contains("Mobile") || ua.contains("Android") {
        "Mobile"
    } else {
        "Desktop"
    }
}

/// 解析 User-Agent，缺失时三项均为 `Unknown`
pub fn parse_user_agent(user_agent: Option<&str>) -> UserAgentInfo {
    match user_agent {
        Some(ua) if !ua.trim().is_empty() => UserAgentInfo {
            browser: detect_browser(ua).to_string(),
            os: detect_os(ua),
            device: detect_device(ua).to_string(),
        },
        _ => UserAgentInfo {
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
            device: UNKNOWN.to_string(),
        },
    }
}

/// 提取客户端 IP：优先 `x-forwarded-for` 的第一跳，其次 `x-real-ip`
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        })
        .map(|v| v.to_string())
}

/// 从请求头构造设备信息（不做地理位置查询）
pub fn device_info_from_headers(headers: &HeaderMap) -> DeviceInfo {
    let user_agent = headers
        .get(http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let parsed = parse_user_agent(user_agent);

    DeviceInfo {
        ip_address: client_ip(headers),
        user_agent: user_agent.map(|s| s.to_string()),
        browser: Some(parsed.browser),
        os: Some(parsed.os),
        device: Some(parsed.device),
        country: None,
        city: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    #[test]
    fn test_missing_user_agent() {
        let info = parse_user_agent(None);
        assert_eq!(info.browser, "Unknown");
        assert_eq!(info.os, "Unknown");
        assert_eq!(info.device, "Unknown");
    }

    #[test]
    fn test_desktop_browsers() {
        let chrome = parse_user_agent(Some(CHROME_WIN));
        assert_eq!(chrome.browser, "Chrome");
        assert_eq!(chrome.os, "Windows 10/11");
        assert_eq!(chrome.device, "Desktop");

        assert_eq!(parse_user_agent(Some(EDGE_WIN)).browser, "Edge");

        let safari = parse_user_agent(Some(SAFARI_MAC));
        assert_eq!(safari.browser, "Safari");
        assert_eq!(safari.os, "macOS 10.15");

        let firefox = parse_user_agent(Some(FIREFOX_LINUX));
        assert_eq!(firefox.browser, "Firefox");
        assert_eq!(firefox.os, "Linux");
    }

    #[test]
    fn test_mobile_and_tablet() {
        let android = parse_user_agent(Some(ANDROID_CHROME));
        assert_eq!(android.os, "Android 14");
        assert_eq!(android.device, "Mobile");

        let ipad = parse_user_agent(Some(IPAD));
        assert_eq!(ipad.os, "iOS");
        assert_eq!(ipad.device, "Tablet");
    }

    #[test]
    fn test_client_ip_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.2"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_device_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::USER_AGENT, HeaderValue::from_static(FIREFOX_LINUX));
        let info = device_info_from_headers(&headers);
        assert_eq!(info.browser.as_deref(), Some("Firefox"));
        assert!(info.ip_address.is_none());
        assert!(info.country.is_none());
    }
}
