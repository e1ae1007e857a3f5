//! Filename and entity-key sanitization.
//!
//! Every name the store writes is a fixed point of [`sanitize_file_name`]:
//! `[a-z0-9_-]+` optionally followed by `.` and a `[a-z0-9]{1,10}` extension.
//! Listing relies on this to recognise files it did not write.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const MAX_STEM_LEN: usize = 120;
pub const MAX_EXTENSION_LEN: usize = 10;
pub const MAX_ENTITY_KEY_LEN: usize = 96;
pub const FALLBACK_FILE_STEM: &str = "file";
pub const FALLBACK_ENTITY_KEY: &str = "entity";

/// Extensions that must never be served from the public static root.
pub const BLOCKED_EXTENSIONS: &[&str] = &[
    "exe", "bat", "cmd", "com", "ps1", "sh", "bash", "zsh", "js", "mjs", "cjs", "ts", "tsx",
    "jsx", "php", "py", "rb", "pl", "jar", "html", "htm", "svg",
];

fn cyrillic_to_latin(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'і' => "i",
        'ї' => "yi",
        'є' => "ye",
        'ґ' => "g",
        _ => return None,
    };
    Some(latin)
}

/// Transliterate Cyrillic to Latin, keeping the capitalisation of the source letter.
pub fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        let lower = c.to_lowercase().next().unwrap_or(c);
        match cyrillic_to_latin(lower) {
            Some(latin) if c != lower => {
                let mut letters = latin.chars();
                if let Some(first) = letters.next() {
                    out.push(first.to_ascii_uppercase());
                    out.extend(letters);
                }
            }
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c: char| c == '-' || c == '_')
}

/// Reduce arbitrary text to a lowercase `[a-z0-9_-]` token of at most `max_len` chars.
fn slugify(input: &str, max_len: usize) -> String {
    let latin: String = transliterate(input)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let mut out = String::with_capacity(latin.len());
    let mut last_dash = false;
    for c in latin.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '_' {
            c.to_ascii_lowercase()
        } else {
            '-'
        };
        if mapped == '-' {
            if last_dash {
                continue;
            }
            last_dash = true;
        } else {
            last_dash = false;
        }
        out.push(mapped);
    }

    let truncated: String = trim_separators(&out).chars().take(max_len).collect();
    trim_separators(&truncated).to_string()
}

/// Last path component, accepting both `/` and `\` separators.
pub fn base_name(input: &str) -> &str {
    input
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(input)
}

/// Split `name` into stem and extension at the last dot.
///
/// A leading dot does not start an extension (`.env` has none), and a trailing
/// dot yields an empty one.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    }
}

fn join_name(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Sanitize an uploaded file name into the managed `stem[.ext]` form.
pub fn sanitize_file_name(input: &str) -> String {
    let (raw_stem, raw_extension) = split_extension(base_name(input));

    let extension: String = slugify(raw_extension, usize::MAX)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(MAX_EXTENSION_LEN)
        .collect();

    let mut stem = slugify(raw_stem, MAX_STEM_LEN);

    // `photo.jpg.jpg` sanitizes to stem `photo-jpg`; drop the duplicated extension.
    if !extension.is_empty() {
        let duplicate = format!("-{}", extension);
        while stem.len() > duplicate.len() && stem.ends_with(&duplicate) {
            stem.truncate(stem.len() - duplicate.len());
            stem = trim_separators(&stem).to_string();
        }
    }

    if stem.is_empty() {
        stem = FALLBACK_FILE_STEM.to_string();
    }

    join_name(&stem, &extension)
}

/// Sanitize an entity key (e.g. an article id) into a folder name.
pub fn sanitize_entity_key(input: &str) -> String {
    let key = slugify(input, MAX_ENTITY_KEY_LEN);
    if key.is_empty() {
        FALLBACK_ENTITY_KEY.to_string()
    } else {
        key
    }
}

/// True when `name` is exactly what the sanitizer would produce for it.
pub fn is_managed_name(name: &str) -> bool {
    !name.is_empty() && sanitize_file_name(name) == name
}

/// Lowercased extension of a name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let (_, extension) = split_extension(base_name(name));
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_ascii_lowercase())
    }
}

pub fn is_blocked_extension(extension: &str) -> bool {
    let extension = extension.to_ascii_lowercase();
    BLOCKED_EXTENSIONS.contains(&extension.as_str())
}

/// Extension used for uploads that arrive without a usable name.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let extension = match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/bmp" => "bmp",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/vnd.ms-powerpoint" => "ppt",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "pptx",
        "application/rtf" => "rtf",
        "text/plain" => "txt",
        "text/csv" => "csv",
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => return None,
    };
    Some(extension)
}

/// Desired stored name for an upload, before collision handling.
///
/// An empty original name falls back to `file.{ext}` from the MIME type; a name
/// without an extension borrows one from the MIME type when it is known.
pub fn upload_name(original: &str, content_type: &str) -> String {
    let base = base_name(original.trim()).trim();
    let mime_extension = extension_for_mime(content_type);
    let (_, extension) = split_extension(base);

    let candidate = match (base.is_empty(), extension.is_empty(), mime_extension) {
        (true, _, Some(ext)) => format!("{}.{}", FALLBACK_FILE_STEM, ext),
        (true, _, None) => FALLBACK_FILE_STEM.to_string(),
        (false, true, Some(ext)) => format!("{}.{}", base, ext),
        _ => base.to_string(),
    };

    sanitize_file_name(&candidate)
}

/// `{stem}-{n}.{ext}`, shortening the stem so the result stays a managed name.
pub fn numbered_name(name: &str, n: u32) -> String {
    let (stem, extension) = split_extension(name);
    let suffix = format!("-{}", n);
    let keep = MAX_STEM_LEN.saturating_sub(suffix.len());
    let shortened: String = stem.chars().take(keep).collect();
    let shortened = trim_separators(&shortened);
    let stem = if shortened.is_empty() {
        FALLBACK_FILE_STEM
    } else {
        shortened
    };
    join_name(&format!("{}{}", stem, suffix), extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_managed_shape(name: &str) {
        let (stem, extension) = split_extension(name);
        assert!(!stem.is_empty(), "empty stem in {name:?}");
        assert!(
            stem.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'),
            "bad stem in {name:?}"
        );
        assert!(extension.len() <= MAX_EXTENSION_LEN);
        assert!(extension
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        if name.contains('.') {
            assert!(!extension.is_empty(), "dangling dot in {name:?}");
        }
    }

    #[test]
    fn strips_directories() {
        assert_eq!(sanitize_file_name("../../evil.sh"), "evil.sh");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\Report.PDF"), "report.pdf");
        assert_eq!(sanitize_file_name("/etc/passwd"), "passwd");
    }

    #[test]
    fn transliterates_cyrillic() {
        assert_eq!(sanitize_file_name("Отчёт за май.docx"), "otchet-za-may.docx");
        assert_eq!(sanitize_file_name("объявление.pdf"), "obyavlenie.pdf");
        assert_eq!(transliterate("Щука Ёж"), "Schuka Ezh");
        assert_eq!(transliterate("ЖУК"), "ZhUK");
    }

    #[test]
    fn removes_accents() {
        assert_eq!(sanitize_file_name("Café Crème.JPG"), "cafe-creme.jpg");
        assert_eq!(sanitize_file_name("naïve résumé.txt"), "naive-resume.txt");
    }

    #[test]
    fn collapses_and_trims_separators() {
        assert_eq!(sanitize_file_name("  my   photo (1).png"), "my-photo-1.png");
        assert_eq!(sanitize_file_name("__draft__.txt"), "draft.txt");
        assert_eq!(sanitize_file_name("a - - b.txt"), "a-b.txt");
        assert_eq!(sanitize_file_name("snake_case_name.md"), "snake_case_name.md");
    }

    #[test]
    fn falls_back_for_empty_stems() {
        assert_eq!(sanitize_file_name(""), "file");
        assert_eq!(sanitize_file_name("!!!.png"), "file.png");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name("中文.jpg"), "file.jpg");
        assert_eq!(sanitize_entity_key("%%%"), "entity");
    }

    #[test]
    fn limits_lengths() {
        let long = format!("{}.{}", "a".repeat(300), "b".repeat(40));
        let name = sanitize_file_name(&long);
        let (stem, extension) = split_extension(&name);
        assert_eq!(stem.len(), MAX_STEM_LEN);
        assert_eq!(extension.len(), MAX_EXTENSION_LEN);

        let key = sanitize_entity_key(&"k".repeat(200));
        assert_eq!(key.len(), MAX_ENTITY_KEY_LEN);
    }

    #[test]
    fn truncation_does_not_leave_trailing_separator() {
        let input = format!("{}-tail.txt", "a".repeat(MAX_STEM_LEN - 1));
        let name = sanitize_file_name(&input);
        assert!(!split_extension(&name).0.ends_with('-'));
        assert_eq!(sanitize_file_name(&name), name);
    }

    #[test]
    fn extension_is_restricted() {
        assert_eq!(sanitize_file_name("archive.tar.gz"), "archive-tar.gz");
        assert_eq!(sanitize_file_name("weird.j_p-g"), "weird.jpg");
        assert_eq!(sanitize_file_name("trailing."), "trailing");
        assert_eq!(sanitize_file_name(".env"), "env");
    }

    #[test]
    fn deduplicates_repeated_extension() {
        assert_eq!(sanitize_file_name("photo.jpg.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("photo.JPG.jpg.jpg"), "photo.jpg");
        assert_eq!(sanitize_file_name("jpg.jpg"), "jpg.jpg");
    }

    #[test]
    fn sanitizer_is_idempotent_and_well_formed() {
        let inputs = [
            "",
            ".",
            "..",
            "../../evil.sh",
            "Отчёт за май.docx",
            "ПРИВЕТ мир!!.PNG",
            "photo.jpg.jpg",
            "  spaced   out  .txt  ",
            "a.b.c.d.e",
            "-_-_-",
            "x.2",
            "file-2.2",
            "名前.txt",
            "über_ß.tiff",
            "C:\\temp\\Ünïcödé.JPEG",
            "name.with.very-long-extension-here",
        ];
        for input in inputs {
            let once = sanitize_file_name(input);
            assert_managed_shape(&once);
            assert_eq!(sanitize_file_name(&once), once, "not idempotent for {input:?}");

            let key = sanitize_entity_key(input);
            assert_eq!(sanitize_entity_key(&key), key);
            assert!(key
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));
        }
    }

    #[test]
    fn blocked_extensions_are_case_insensitive() {
        for ext in ["exe", "PHP", "Svg", "html", "htm", "sh", "mjs"] {
            assert!(is_blocked_extension(ext), "{ext} should be blocked");
        }
        for ext in ["jpg", "pdf", "docx", "txt"] {
            assert!(!is_blocked_extension(ext));
        }
    }

    #[test]
    fn upload_name_uses_mime_table() {
        assert_eq!(upload_name("", "image/jpeg"), "file.jpg");
        assert_eq!(upload_name("   ", "application/pdf; charset=binary"), "file.pdf");
        assert_eq!(upload_name("", "application/x-unknown"), "file");
        assert_eq!(upload_name("scan", "image/png"), "scan.png");
        assert_eq!(upload_name("scan.tiff", "image/png"), "scan.tiff");
    }

    #[test]
    fn numbered_names_stay_managed() {
        assert_eq!(numbered_name("photo.jpg", 2), "photo-2.jpg");
        assert_eq!(numbered_name("readme", 3), "readme-3");

        let long = sanitize_file_name(&format!("{}.png", "z".repeat(200)));
        let numbered = numbered_name(&long, 12);
        assert!(split_extension(&numbered).0.len() <= MAX_STEM_LEN);
        assert!(is_managed_name(&numbered));
    }

    #[test]
    fn extension_of_reports_lowercase() {
        assert_eq!(extension_of("Photo.JPG"), Some("jpg".to_string()));
        assert_eq!(extension_of("README"), None);
    }
}
