/// Case-insensitive keyword screen for promotional board posts.
#[derive(Debug, Clone)]
pub struct SpamFilter {
    keywords: Vec<String>,
}

impl SpamFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn is_spam(&self, text: &str) -> bool {
        self.matched_keyword(text).is_some()
    }

    pub fn matched_keyword(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .find(|keyword| haystack.contains(keyword.as_str()))
            .map(String::as_str)
    }
}
