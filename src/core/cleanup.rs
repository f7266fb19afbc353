use regex::Regex;

/// Strips the wrappers some providers put around Markdown output
pub struct ResponseCleaner {
    /// Promotional marker line such as `**Generated by Pollinations**` closing the text
    boilerplate_regex: Regex,

    /// Leading fence opener, with or without a language tag
    fence_open_regex: Regex,

    /// Trailing fence closer on its own line
    fence_close_regex: Regex,
}

impl ResponseCleaner {
    pub fn new() -> Self {
        Self {
            boilerplate_regex: Regex::new(
                r"(?i)(?:\A|\n)\s*\*\*(?:generative ai by using|generated by|powered by)\s+[^*\n]+\*\*[^\n]*\s*\z",
            )
            .expect("Invalid boilerplate regex"),
            fence_open_regex: Regex::new(r"\A\s*```[\w.+-]*[ \t]*(?:\r?\n|\z)")
                .expect("Invalid fence opener regex"),
            fence_close_regex: Regex::new(r"(\A|\n)```\s*\z")
                .expect("Invalid fence closer regex"),
        }
    }

    /// Clean a raw provider response.
    ///
    /// Passes repeat until nothing changes, so `clean(clean(x)) == clean(x)`.
    pub fn clean(&self, raw: &str) -> String {
        let mut current = raw.to_string();
        loop {
            let next = self.single_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn single_pass(&self, text: &str) -> String {
        let text = self.boilerplate_regex.replace(text, "");
        let text = self.fence_open_regex.replace(&text, "");
        self.fence_close_regex.replace(&text, "$1").into_owned()
    }
}

impl Default for ResponseCleaner {
    fn default() -> Self {
        Self::new()
    }
}
