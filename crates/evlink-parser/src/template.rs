use crate::Config;

/// Expand a message template in a single left-to-right pass: backslash
/// escapes, `<...>` tags and `{i}` argument placeholders. Formatter output
/// and substituted argument values are skipped over, never re-scanned.
pub(crate) fn expand(template: &str, config: &Config, args: &[Option<String>]) -> String {
    let mut ret = template.to_string();
    let mut i = 0;
    while i < ret.len() {
        match ret.as_bytes()[i] {
            b'\\' => {
                // drop the backslash, pass the next char through untouched
                ret.remove(i);
                if i < ret.len() {
                    i += char_width(&ret, i);
                }
            }
            b'<' => match expand_tag(&mut ret, i, config) {
                Some(skip) => i += skip,
                None => i += 1,
            },
            b'{' => match expand_placeholder(&mut ret, i, args) {
                Some(skip) => i += skip,
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    ret
}

/// Handle the tag opening at byte `i`. On success the tag is spliced out of
/// `ret` and the returned offset says where scanning resumes, relative to
/// `i` (0 re-scans retained content, content length skips it). `None` means
/// no complete tag: the `<` stays and scanning moves past it.
fn expand_tag(ret: &mut String, i: usize, config: &Config) -> Option<usize> {
    // tag name runs to the first unescaped '>' or ' '
    let tag_end = find_unescaped(ret, i + 1, &[b'>', b' '])?;
    let content_start = find_unescaped(ret, i + 1, &[b'>'])?;
    let tag = ret[i + 1..tag_end].to_string();
    let close = find_closing(ret, tag_end, &tag)?;
    if close <= content_start {
        // the only '>' belongs to the closing tag; treat as unmatched
        return None;
    }

    let mut content = ret[content_start + 1..close].to_string();

    // only the first name="value" attribute is recognized
    let mut attr_name = String::new();
    let mut attr_value = String::new();
    if ret.as_bytes()[tag_end] == b' ' {
        let attrs = &ret[tag_end + 1..content_start];
        if let Some(eq) = attrs.find("=\"") {
            if let Some(quote) = find_unescaped(attrs, eq + 2, &[b'"']) {
                attr_name = attrs[..eq].to_string();
                attr_value = attrs[eq + 2..quote].to_string();
            }
        }
    }

    let num_skip;
    match tag.as_str() {
        "param" => {
            content = (config.formatters.param)(&content);
            num_skip = content.len();
        }
        "a" => {
            let link = if attr_name == "href" && !attr_value.is_empty() {
                attr_value
            } else {
                content.clone()
            };
            content = (config.formatters.url)(&content, &link);
            num_skip = content.len();
        }
        "profile" => {
            if attr_name == "name" && !attr_value.is_empty() {
                let matches = match attr_value.strip_prefix('!') {
                    Some(negated) => config.profile.as_str() != negated,
                    None => config.profile.as_str() == attr_value,
                };
                if !matches {
                    content.clear();
                }
            }
            // retained content is ordinary template text, re-scan it
            num_skip = 0;
        }
        _ => {
            // unknown tag: remove it together with its content
            content.clear();
            num_skip = 0;
        }
    }

    ret.replace_range(i..close + tag.len() + 3, &content);
    Some(num_skip)
}

/// Handle the `{i}` placeholder at byte `i`. Returns the length of the
/// substituted text, or `None` to keep the token literal (malformed index,
/// out of range, or the argument did not fit the 32-byte buffer).
fn expand_placeholder(ret: &mut String, i: usize, args: &[Option<String>]) -> Option<usize> {
    let close = find_unescaped(ret, i + 1, &[b'}'])?;
    let token = &ret[i + 1..close];
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: usize = token.parse().ok()?;
    let value = args.get(index.checked_sub(1)?).and_then(|v| v.clone())?;
    ret.replace_range(i..=close, &value);
    Some(value.len())
}

fn find_unescaped(s: &str, from: usize, targets: &[u8]) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if targets.contains(&bytes[i]) {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn find_closing(s: &str, from: usize, tag: &str) -> Option<usize> {
    let needle = format!("</{}>", tag);
    s[from..].find(&needle).map(|p| p + from)
}

fn char_width(s: &str, i: usize) -> usize {
    s[i..].chars().next().map_or(1, |c| c.len_utf8())
}
