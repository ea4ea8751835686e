// SPDX-FileCopyrightText: 2025 The Wayfarer Authors
//
// SPDX-License-Identifier: Apache-2.0

/// The platform the client appears to run on, as far as a user-agent string
/// reveals it. Only used to pick the right permission remediation text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Platform {
    AndroidChrome,
    Ios,
    MacosDesktop,
    ChromeDesktop,
    FirefoxDesktop,
    Unknown,
}

impl Platform {
    pub(crate) fn detect(user_agent: &str) -> Self {
        // Order matters: Chrome on Android reports both tokens, and every
        // Chrome build claims to be Safari.
        if user_agent.contains("Android") && user_agent.contains("Chrome") {
            Self::AndroidChrome
        } else if user_agent.contains("iPhone")
            || user_agent.contains("iPad")
            || user_agent.contains("iPod")
        {
            Self::Ios
        } else if user_agent.contains("Firefox") {
            Self::FirefoxDesktop
        } else if user_agent.contains("Chrome") {
            Self::ChromeDesktop
        } else if user_agent.contains("Macintosh") {
            Self::MacosDesktop
        } else {
            Self::Unknown
        }
    }

    /// Step-by-step instructions for re-enabling location access on this
    /// platform.
    pub(crate) const fn remediation(self) -> &'static str {
        match self {
            Self::AndroidChrome => {
                "Open Chrome's menu, go to Settings > Site settings > Location, \
                 and allow location access for this site. Also check that location \
                 is enabled for Chrome in Android's Settings > Location > App permissions."
            }
            Self::Ios => {
                "Open the iOS Settings app, go to Privacy & Security > Location \
                 Services, make sure Location Services is on, and set your browser \
                 to \"While Using the App\". Then reload the page."
            }
            Self::MacosDesktop => {
                "Open System Settings > Privacy & Security > Location Services, \
                 make sure Location Services is enabled, and allow your browser to \
                 use your location. Then reload the page."
            }
            Self::ChromeDesktop => {
                "Click the lock icon next to the address bar, set Location to \
                 Allow, and reload the page. You can also manage this under \
                 chrome://settings/content/location."
            }
            Self::FirefoxDesktop => {
                "Click the permissions icon next to the address bar, clear the \
                 blocked Location permission, and reload the page so Firefox asks \
                 again."
            }
            Self::Unknown => {
                "Check your browser's site permissions and your system's location \
                 settings, allow location access for this site, and reload the page."
            }
        }
    }
}
