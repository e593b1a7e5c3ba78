//! Name normalization: slugs and post-type tags.

use std::sync::LazyLock;

use regex::Regex;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));
static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w ]+").expect("valid regex"));
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_ ]+").expect("valid regex"));

/// Fold Latin and Vietnamese diacritics to plain ASCII letters.
pub fn remove_accents(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'ạ' | 'ả' | 'ã' | 'â' | 'ầ' | 'ấ' | 'ậ' | 'ẩ' | 'ẫ' | 'ă' | 'ằ' | 'ắ'
        | 'ặ' | 'ẳ' | 'ẵ' | 'ä' | 'å' => 'a',
        'è' | 'é' | 'ẹ' | 'ẻ' | 'ẽ' | 'ê' | 'ề' | 'ế' | 'ệ' | 'ể' | 'ễ' | 'ë' => 'e',
        'ì' | 'í' | 'ị' | 'ỉ' | 'ĩ' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ọ' | 'ỏ' | 'õ' | 'ô' | 'ồ' | 'ố' | 'ộ' | 'ổ' | 'ỗ' | 'ơ' | 'ờ' | 'ớ'
        | 'ợ' | 'ở' | 'ỡ' | 'ö' => 'o',
        'ù' | 'ú' | 'ụ' | 'ủ' | 'ũ' | 'ư' | 'ừ' | 'ứ' | 'ự' | 'ử' | 'ữ' | 'û' | 'ü' => 'u',
        'ỳ' | 'ý' | 'ỵ' | 'ỷ' | 'ỹ' | 'ÿ' => 'y',
        'đ' => 'd',
        'ç' => 'c',
        'ñ' => 'n',
        'À' | 'Á' | 'Ạ' | 'Ả' | 'Ã' | 'Â' | 'Ầ' | 'Ấ' | 'Ậ' | 'Ẩ' | 'Ẫ' | 'Ă' | 'Ằ' | 'Ắ'
        | 'Ặ' | 'Ẳ' | 'Ẵ' | 'Ä' | 'Å' => 'A',
        'È' | 'É' | 'Ẹ' | 'Ẻ' | 'Ẽ' | 'Ê' | 'Ề' | 'Ế' | 'Ệ' | 'Ể' | 'Ễ' | 'Ë' => 'E',
        'Ì' | 'Í' | 'Ị' | 'Ỉ' | 'Ĩ' | 'Î' | 'Ï' => 'I',
        'Ò' | 'Ó' | 'Ọ' | 'Ỏ' | 'Õ' | 'Ô' | 'Ồ' | 'Ố' | 'Ộ' | 'Ổ' | 'Ỗ' | 'Ơ' | 'Ờ' | 'Ớ'
        | 'Ợ' | 'Ở' | 'Ỡ' | 'Ö' => 'O',
        'Ù' | 'Ú' | 'Ụ' | 'Ủ' | 'Ũ' | 'Ư' | 'Ừ' | 'Ứ' | 'Ự' | 'Ử' | 'Ữ' | 'Û' | 'Ü' => 'U',
        'Ỳ' | 'Ý' | 'Ỵ' | 'Ỷ' | 'Ỹ' => 'Y',
        'Đ' => 'D',
        'Ç' => 'C',
        'Ñ' => 'N',
        other => other,
    }
}

/// Derive a URL slug from a title.
///
/// `"Phim Hành Động"` → `"phim-hanh-dong"`
pub fn slugify(title: &str) -> String {
    let folded = remove_accents(title.trim()).to_lowercase();
    let ascii: String = folded.chars().filter(char::is_ascii).collect();
    let cleaned = NON_WORD_RE.replace_all(&ascii, "");
    // Runs of spaces and underscores become one dash.
    let dashed = SEPARATOR_RE.replace_all(&cleaned, "-");
    dashed.trim_matches('-').to_string()
}

pub fn is_slug(text: &str) -> bool {
    SLUG_RE.is_match(text)
}

/// Post types are plain uppercase ASCII letters.
pub fn is_upper_alpha(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_uppercase())
}
