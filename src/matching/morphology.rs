/// Plural/singular surface forms of a lowercase token, the token itself first.
///
/// This is a heuristic: irregular plurals ("mice", "children") are not known,
/// and a few nonsense forms ("boxs") are generated alongside the real ones.
pub fn variants(token: &str) -> Vec<String> {
    let mut forms = vec![token.to_string(), format!("{token}s")];

    if let Some(stem) = token.strip_suffix('y') {
        forms.push(format!("{stem}ies"));
    }
    if let Some(stem) = token.strip_suffix('s') {
        forms.push(stem.to_string());
    }
    if ["s", "x", "z", "sh", "ch"]
        .iter()
        .any(|suffix| token.ends_with(suffix))
    {
        forms.push(format!("{token}es"));
    }

    forms
}

/// Two tokens are the same word when their variant sets intersect.
pub fn is_exact_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let rhs = variants(b);
    variants(a).iter().any(|form| rhs.contains(form))
}
