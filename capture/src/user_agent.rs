//! User-Agent parsing into the client metadata tree.
//!
//! Recognises the common desktop and mobile browsers, their rendering
//! engines, operating systems, devices and cpu architectures from the raw
//! `User-Agent` header. Parsing is pure and never fails: anything not
//! recognised is reported as `null`.

use crate::metadata::MetadataValue;

/// A named component with an optional version (browser, engine, os).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    pub name: Option<&'static str>,
    pub version: Option<String>,
}

impl Component {
    fn new(name: &'static str, version: Option<&str>) -> Self {
        Self {
            name: Some(name),
            version: version.map(str::to_string),
        }
    }

    /// Leading numeric segment of the version, e.g. "120" for "120.0.6099.71".
    pub fn major(&self) -> Option<&str> {
        self.version
            .as_deref()
            .and_then(|v| v.split('.').next())
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Device {
    pub vendor: Option<&'static str>,
    pub model: Option<String>,
    pub kind: Option<&'static str>,
}

/// Parsed information from a User-Agent header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ua: String,
    pub browser: Component,
    pub engine: Component,
    pub os: Component,
    pub device: Device,
    pub cpu_architecture: Option<&'static str>,
}

// Checked in order, the first token found wins. Chromium derivatives also
// carry a "Chrome/" token so they must come before it.
const BROWSER_TOKENS: &[(&str, &str)] = &[
    ("EdgiOS/", "Edge"),
    ("EdgA/", "Edge"),
    ("Edg/", "Edge"),
    ("Edge/", "Edge"),
    ("OPR/", "Opera"),
    ("SamsungBrowser/", "Samsung Browser"),
    ("YaBrowser/", "Yandex"),
    ("CriOS/", "Mobile Chrome"),
    ("FxiOS/", "Mobile Firefox"),
    ("Firefox/", "Firefox"),
    ("Chromium/", "Chromium"),
    ("Chrome/", "Chrome"),
    ("MSIE ", "IE"),
];

impl ClientInfo {
    pub fn parse(ua: &str) -> Self {
        Self {
            ua: ua.to_string(),
            browser: detect_browser(ua),
            engine: detect_engine(ua),
            os: detect_os(ua),
            device: detect_device(ua),
            cpu_architecture: detect_cpu(ua),
        }
    }

    pub fn to_metadata(&self) -> MetadataValue {
        MetadataValue::map([
            ("ua", MetadataValue::from(self.ua.as_str())),
            (
                "browser",
                MetadataValue::map([
                    ("name", self.browser.name.into()),
                    ("version", self.browser.version.clone().into()),
                    ("major", self.browser.major().into()),
                ]),
            ),
            (
                "engine",
                MetadataValue::map([
                    ("name", self.engine.name.into()),
                    ("version", self.engine.version.clone().into()),
                ]),
            ),
            (
                "os",
                MetadataValue::map([
                    ("name", self.os.name.into()),
                    ("version", self.os.version.clone().into()),
                ]),
            ),
            (
                "device",
                MetadataValue::map([
                    ("vendor", self.device.vendor.into()),
                    ("model", self.device.model.clone().into()),
                    ("type", self.device.kind.into()),
                ]),
            ),
            (
                "cpu",
                MetadataValue::map([("architecture", self.cpu_architecture.into())]),
            ),
        ])
    }
}

/// Parses a raw header value into a metadata tree. A missing or empty
/// user agent yields an empty tree.
pub fn parse(user_agent: Option<&str>) -> MetadataValue {
    match user_agent.map(str::trim) {
        Some(ua) if !ua.is_empty() => ClientInfo::parse(ua).to_metadata(),
        _ => MetadataValue::empty(),
    }
}

/// Returns the version-looking run of characters following `token`.
fn version_after<'a>(ua: &'a str, token: &str) -> Option<&'a str> {
    let start = ua.find(token)? + token.len();
    let rest = &ua[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '_'))
        .unwrap_or(rest.len());
    let version = rest[..end].trim_end_matches(['.', '_']);
    (!version.is_empty()).then_some(version)
}

fn is_ios(ua: &str) -> bool {
    ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod")
}

fn is_mobile_android(ua: &str) -> bool {
    ua.contains("Android") && ua.contains("Mobile")
}

fn detect_browser(ua: &str) -> Component {
    for (token, name) in BROWSER_TOKENS {
        if ua.contains(token) {
            let name = match *name {
                "Chrome" if is_mobile_android(ua) => "Mobile Chrome",
                "Firefox" if is_mobile_android(ua) => "Mobile Firefox",
                other => other,
            };
            return Component::new(name, version_after(ua, token));
        }
    }

    if ua.contains("Trident/") {
        return Component::new("IE", version_after(ua, "rv:"));
    }

    if ua.contains("Safari/") {
        if let Some(version) = version_after(ua, "Version/") {
            let name = if ua.contains("Mobile/") || is_ios(ua) {
                "Mobile Safari"
            } else {
                "Safari"
            };
            return Component::new(name, Some(version));
        }
    }

    Component::default()
}

fn detect_engine(ua: &str) -> Component {
    if let Some(version) = version_after(ua, "Edge/") {
        return Component::new("EdgeHTML", Some(version));
    }
    // Every iOS browser is WebKit underneath, whatever it advertises.
    if !is_ios(ua) {
        if let Some(version) = version_after(ua, "Chrome/").or(version_after(ua, "Chromium/")) {
            return Component::new("Blink", Some(version));
        }
    }
    if let Some(version) = version_after(ua, "Trident/") {
        return Component::new("Trident", Some(version));
    }
    if let Some(version) = version_after(ua, "AppleWebKit/") {
        return Component::new("WebKit", Some(version));
    }
    if let Some(version) = version_after(ua, "Presto/") {
        return Component::new("Presto", Some(version));
    }
    if ua.contains("Gecko/") {
        return Component::new("Gecko", version_after(ua, "rv:"));
    }
    Component::default()
}

fn windows_version(nt: &str) -> &str {
    match nt {
        "10.0" => "10",
        "6.3" => "8.1",
        "6.2" => "8",
        "6.1" => "7",
        "6.0" => "Vista",
        "5.1" | "5.2" => "XP",
        "5.0" => "2000",
        other => other,
    }
}

fn detect_os(ua: &str) -> Component {
    if ua.contains("Windows Phone") {
        return Component::new("Windows Phone", version_after(ua, "Windows Phone "));
    }
    if let Some(nt) = version_after(ua, "Windows NT ") {
        return Component::new("Windows", Some(windows_version(nt)));
    }
    if ua.contains("Windows") {
        return Component::new("Windows", None);
    }
    if is_ios(ua) {
        let version = version_after(ua, "iPhone OS ")
            .or(version_after(ua, "CPU OS "))
            .map(|v| v.replace('_', "."));
        return Component {
            name: Some("iOS"),
            version,
        };
    }
    if ua.contains("Android") {
        return Component::new("Android", version_after(ua, "Android "));
    }
    if let Some(rest) = ua.split("CrOS ").nth(1) {
        // "CrOS x86_64 14541.0.0": the version follows the architecture.
        let version = rest
            .split_whitespace()
            .nth(1)
            .map(|v| v.trim_end_matches([')', ';']));
        return Component::new("Chromium OS", version);
    }
    if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        let version = version_after(ua, "Mac OS X ").map(|v| v.replace('_', "."));
        return Component {
            name: Some("Mac OS"),
            version,
        };
    }
    if ua.contains("Ubuntu") {
        return Component::new("Ubuntu", version_after(ua, "Ubuntu/"));
    }
    if ua.contains("Linux") {
        return Component::new("Linux", None);
    }
    Component::default()
}

fn detect_device(ua: &str) -> Device {
    let apple = |model: &str, kind: Option<&'static str>| Device {
        vendor: Some("Apple"),
        model: Some(model.to_string()),
        kind,
    };

    if ua.contains("iPad") {
        return apple("iPad", Some("tablet"));
    }
    if ua.contains("iPhone") {
        return apple("iPhone", Some("mobile"));
    }
    if ua.contains("iPod") {
        return apple("iPod touch", Some("mobile"));
    }
    if ua.contains("Android") {
        let model = android_model(ua);
        return Device {
            vendor: model.as_deref().and_then(android_vendor),
            model,
            kind: Some(if ua.contains("Mobile") {
                "mobile"
            } else {
                "tablet"
            }),
        };
    }
    if ua.contains("Macintosh") {
        return apple("Macintosh", None);
    }
    Device::default()
}

fn is_locale(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 5 && bytes[2] == b'-' && segment.is_ascii()
}

/// Model name from the platform section, e.g. "SM-S901B" in
/// "(Linux; Android 13; SM-S901B Build/TP1A)".
fn android_model(ua: &str) -> Option<String> {
    let open = ua.find('(')? + 1;
    let close = open + ua[open..].find(')')?;
    ua[open..close]
        .split(';')
        .map(str::trim)
        .skip_while(|segment| !segment.starts_with("Android"))
        .skip(1)
        .find(|segment| {
            !segment.is_empty()
                && !is_locale(segment)
                && !matches!(*segment, "Mobile" | "Tablet" | "wv" | "U")
                && !segment.starts_with("rv:")
        })
        .map(|segment| {
            segment
                .split(" Build/")
                .next()
                .unwrap_or(segment)
                .trim()
                .to_string()
        })
}

fn android_vendor(model: &str) -> Option<&'static str> {
    const VENDORS: &[(&str, &str)] = &[
        ("SM-", "Samsung"),
        ("GT-", "Samsung"),
        ("SAMSUNG", "Samsung"),
        ("Pixel", "Google"),
        ("Nexus", "Google"),
        ("LG-", "LG"),
        ("HUAWEI", "Huawei"),
        ("Redmi", "Xiaomi"),
        ("ONEPLUS", "OnePlus"),
    ];
    VENDORS
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, vendor)| *vendor)
}

fn detect_cpu(ua: &str) -> Option<&'static str> {
    let lower = ua.to_ascii_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if any(&["x86_64", "x86-64", "win64", "wow64", "amd64"]) {
        Some("amd64")
    } else if any(&["aarch64", "arm64"]) {
        Some("arm64")
    } else if any(&["armv", "; arm"]) {
        Some("arm")
    } else if any(&["i686", "i586", "i386"]) {
        Some("ia32")
    } else {
        None
    }
}
