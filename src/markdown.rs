use pulldown_cmark::{html, Options, Parser};

/// Renders page markdown to HTML. The rendered HTML is what feed abstracts
/// are cut from, so the extension set mirrors what a site build would render.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_to_html() {
        assert_eq!(
            "<h1>Hello</h1>\n<p>World <del>gone</del></p>\n",
            to_html("# Hello\n\nWorld ~~gone~~\n"),
        );
    }

    #[test]
    fn test_to_html_empty() {
        assert_eq!("", to_html(""));
    }
}
