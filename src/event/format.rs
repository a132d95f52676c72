//! printf-style message templates
//!
//! Arguments are always strings, so only the string verbs `%v`, `%s`, `%q`,
//! `%x` and `%X` render them; any other letter verb still consumes an
//! argument and renders as a bad-verb marker. `%%` is a literal percent.

use lazy_regex::regex;

/// Render `template` against `args`, consuming one argument per verb.
///
/// A verb with no argument left renders as `%!v(MISSING)`, a verb that does
/// not apply to strings renders as `%!d(string=arg)`, and leftover arguments
/// are appended as `%!(EXTRA string=arg, ...)`.
pub fn format_message<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    let mut next = 0;

    for m in regex!(r"%[%a-zA-Z]").find_iter(template) {
        out.push_str(&template[last..m.start()]);
        last = m.end();

        let verb = &m.as_str()[1..];
        if verb == "%" {
            out.push('%');
            continue;
        }

        match args.get(next).map(|arg| arg.as_ref()) {
            Some(arg) => out.push_str(&render(verb, arg)),
            None => out.push_str(&format!("%!{}(MISSING)", verb)),
        }
        next += 1;
    }
    out.push_str(&template[last..]);

    if next < args.len() {
        let extra: Vec<String> = args[next..]
            .iter()
            .map(|arg| format!("string={}", arg.as_ref()))
            .collect();
        out.push_str(&format!("%!(EXTRA {})", extra.join(", ")));
    }

    out
}

fn render(verb: &str, arg: &str) -> String {
    match verb {
        "v" | "s" => arg.to_string(),
        "q" => format!("{:?}", arg),
        "x" => arg.bytes().map(|b| format!("{:02x}", b)).collect(),
        "X" => arg.bytes().map(|b| format!("{:02X}", b)).collect(),
        _ => format!("%!{}(string={})", verb, arg),
    }
}
