/// Reduce rich-text markup to the plain text that gets measured and drawn.
///
/// Tags are dropped and only their text content survives. Block-level boundaries (`<br>`,
/// `</p>`, `</div>`, `</li>`, `</h1>`..`</h6>`) become line breaks, common HTML entities are
/// decoded, runs of whitespace inside a line collapse to one space and blank lines are removed.
pub fn strip_to_plain_text(rich: &str) -> String {
    let mut raw = String::with_capacity(rich.len());
    let mut rest = rich;

    while let Some(lt) = rest.find('<') {
        raw.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];
        let Some(gt) = after.find('>') else {
            // Unterminated tag: keep the remainder as literal text.
            raw.push_str(&rest[lt..]);
            rest = "";
            break;
        };
        if is_line_break_tag(&after[..gt]) {
            raw.push('\n');
        }
        rest = &after[gt + 1..];
    }
    raw.push_str(rest);

    let decoded = decode_entities(&raw);
    let lines: Vec<String> = decoded
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect();
    lines.join("\n")
}

fn is_line_break_tag(tag: &str) -> bool {
    let t = tag.trim().to_ascii_lowercase();
    let name: String = t
        .trim_end_matches('/')
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    matches!(
        name.as_str(),
        "br" | "/p" | "/div" | "/li" | "/h1" | "/h2" | "/h3" | "/h4" | "/h5" | "/h6"
    )
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&after[..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/markup.rs"]
mod tests;
