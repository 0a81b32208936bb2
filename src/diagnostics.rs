/// Renders an error against its source line, rustc-style.
pub fn render(source: &str, kind: &str, line: usize, message: &str, hint: Option<&str>) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let source_line = lines.get(line.saturating_sub(1)).copied().unwrap_or("");

    let line_num = line.to_string();
    let gutter_width = line_num.len();

    let mut out = String::new();

    // error[kind]: message
    out.push_str(&format!("error[{}]: {}\n", kind, message));

    // --> line N
    out.push_str(&format!(
        "{:>width$}--> line {}\n",
        " ",
        line,
        width = gutter_width
    ));

    // empty gutter line
    out.push_str(&format!("{:>width$} |\n", " ", width = gutter_width));

    // source line
    out.push_str(&format!(
        "{:>width$} | {}\n",
        line,
        source_line,
        width = gutter_width
    ));

    out.push_str(&format!("{:>width$} |\n", " ", width = gutter_width));

    if let Some(hint) = hint {
        out.push_str(&format!(
            "{:>width$} = hint: {}\n",
            " ",
            hint,
            width = gutter_width
        ));
    }

    out
}

pub fn suggest_hint(message: &str) -> Option<String> {
    let msg = message.to_lowercase();

    if msg.contains("expected an integer") && msg.contains("null") {
        return Some("the name may be unbound; assign to it first".into());
    }

    if msg.contains("is not callable") {
        return Some("make sure the name is bound to a function before this line".into());
    }

    if msg.contains("division by zero") || msg.contains("modulo by zero") {
        return Some("guard the divisor with an if first".into());
    }

    None
}
