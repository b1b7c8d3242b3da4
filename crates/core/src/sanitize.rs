const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

pub const TAG_PREFIX: &str = "Tag_";

const FALLBACK_FILE: &str = "unnamed";
const FALLBACK_CONTAINER: &str = "unnamed_album";
const FALLBACK_TAG: &str = "unnamed_tag";

/// Makes a file name safe to create on common filesystems.
pub fn sanitize_file_name(value: &str) -> String {
    if value.trim().is_empty() {
        return FALLBACK_FILE.to_string();
    }

    let out = replace_disallowed(value);
    if !is_windows_reserved(&out) {
        return out;
    }

    match out.find('.') {
        Some(pos) => format!("{}_file{}", &out[..pos], &out[pos..]),
        None => format!("{out}_file"),
    }
}

/// Album, folder and user directory names. Trailing dots and spaces are
/// rejected by some filesystems, so they are stripped.
pub fn sanitize_container_name(value: &str) -> String {
    let mut out = trim_container(&replace_disallowed(value.trim()));
    if out.is_empty() {
        return FALLBACK_CONTAINER.to_string();
    }

    if is_windows_reserved(&out) {
        out.push_str("_file");
    }
    out
}

pub fn sanitize_tag_name(value: &str) -> String {
    let out = trim_container(&replace_disallowed(value.trim()));
    if out.is_empty() {
        return format!("{TAG_PREFIX}{FALLBACK_TAG}");
    }

    if out.starts_with(TAG_PREFIX) {
        out
    } else {
        format!("{TAG_PREFIX}{out}")
    }
}

fn replace_disallowed(value: &str) -> String {
    value
        .chars()
        .map(|ch| if is_disallowed_char(ch) { '_' } else { ch })
        .collect()
}

fn trim_container(value: &str) -> String {
    value.trim().trim_end_matches(['.', ' ']).trim().to_string()
}

fn is_disallowed_char(ch: char) -> bool {
    matches!(ch, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
        || ch == '\0'
        || ch.is_control()
}

fn is_windows_reserved(value: &str) -> bool {
    let stem = value
        .split('.')
        .next()
        .unwrap_or(value)
        .to_ascii_uppercase();
    WINDOWS_RESERVED_NAMES
        .iter()
        .any(|reserved| reserved == &stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_replaces_disallowed_chars() {
        assert_eq!(sanitize_file_name("a/b\\c:d*e?f\"g<h>i|j.jpg"), "a_b_c_d_e_f_g_h_i_j.jpg");
    }

    #[test]
    fn file_name_keeps_surrounding_spaces_and_dots() {
        assert_eq!(sanitize_file_name(" photo. "), " photo. ");
    }

    #[test]
    fn empty_inputs_fall_back() {
        assert_eq!(sanitize_file_name("   "), "unnamed");
        assert_eq!(sanitize_container_name(""), "unnamed_album");
        assert_eq!(sanitize_container_name(" ... "), "unnamed_album");
        assert_eq!(sanitize_tag_name("\t"), "Tag_unnamed_tag");
    }

    #[test]
    fn surrounding_control_whitespace_is_trimmed_not_replaced() {
        assert_eq!(sanitize_container_name("\t"), "unnamed_album");
        assert_eq!(sanitize_container_name("\n \t"), "unnamed_album");
        assert_eq!(sanitize_tag_name("\r\n"), "Tag_unnamed_tag");
        assert_eq!(sanitize_container_name("\tRome\n"), "Rome");
        assert_eq!(sanitize_tag_name("\tparis "), "Tag_paris");
        assert_eq!(sanitize_container_name("a\tb"), "a_b");
    }

    #[test]
    fn container_strips_trailing_dots_and_spaces() {
        assert_eq!(sanitize_container_name("  Summer Trip. . .  "), "Summer Trip");
        assert_eq!(sanitize_container_name("Q3: plans?"), "Q3_ plans_");
    }

    #[test]
    fn tag_gets_prefix_once() {
        assert_eq!(sanitize_tag_name("paris"), "Tag_paris");
        assert_eq!(sanitize_tag_name("Tag_paris"), "Tag_paris");
        assert_eq!(sanitize_tag_name("a/b."), "Tag_a_b");
    }

    #[test]
    fn reserved_names_are_suffixed() {
        assert_eq!(sanitize_file_name("AUX"), "AUX_file");
        assert_eq!(sanitize_file_name("con.jpg"), "con_file.jpg");
        assert_eq!(sanitize_container_name("com1"), "com1_file");
    }

    #[test]
    fn sanitizers_are_idempotent() {
        let inputs = [
            "",
            "  ",
            "Summer Trip...",
            "a/b\\c",
            " x . ",
            "CON",
            "Tag_",
            "émigré: ¿qué?",
            "trail. . ",
            "\t",
            "\ta\tb\n",
            " x\t. ",
        ];
        for input in inputs {
            let once = sanitize_file_name(input);
            assert_eq!(sanitize_file_name(&once), once, "file: {input:?}");
            let once = sanitize_container_name(input);
            assert_eq!(sanitize_container_name(&once), once, "container: {input:?}");
            let once = sanitize_tag_name(input);
            assert_eq!(sanitize_tag_name(&once), once, "tag: {input:?}");
        }
    }
}
