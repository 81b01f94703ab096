use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Course, ExternalUrl, File, Folder};

static RESERVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\s]+"#).expect("valid regex"));
static EDGES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-.]+|[-.]+$").expect("valid regex"));
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("valid regex"));

const EMPTY_SLUG: &str = "unnamed";

/// Turn an arbitrary Canvas name into a single filesystem-safe path segment.
///
/// Non-ASCII characters are decomposed and dropped, whitespace and reserved
/// characters collapse into `-`, and leading/trailing dashes or dots are trimmed.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let replaced = RESERVED.replace_all(&ascii, "-");
    let trimmed = EDGES.replace_all(&replaced, "");
    let slug = DASHES.replace_all(&trimmed, "-").to_lowercase();

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Maps courses, folders and module items onto destinations under the sync root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<course>/<ancestors...>/<leaf>`, every segment slugified.
    pub fn resolve<'a, I>(&self, course_name: &str, ancestors: I, leaf: &str) -> PathBuf
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut path = self.directory(course_name, ancestors);
        path.push(slugify(leaf));
        path
    }

    /// Folder-attached files follow their folder hierarchy; anything else,
    /// module files included, lands directly under the course.
    pub fn file_path(&self, course: &Course, folder: Option<&Folder>, file: &File) -> PathBuf {
        match folder {
            Some(folder) => self.resolve(&course.name, folder.segments(), &file.name),
            None => self.resolve(&course.name, std::iter::empty(), &file.name),
        }
    }

    /// External links become `<course>/<module>/<title>.html`.
    pub fn external_url_path(&self, course: &Course, link: &ExternalUrl) -> PathBuf {
        let mut path = self.directory(&course.name, [link.module_name.as_str()]);
        path.push(format!("{}.html", slugify(&link.title)));
        path
    }

    fn directory<'a, I>(&self, course_name: &str, ancestors: I) -> PathBuf
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut path = self.root.join(slugify(course_name));
        for segment in ancestors {
            path.push(slugify(segment));
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::naive_timestamp;

    fn course(name: &str) -> Course {
        Course {
            id: 1,
            code: "INTRO".to_string(),
            name: name.to_string(),
            is_favorite: true,
            term: None,
            updated_at: None,
            saved_at: None,
        }
    }

    fn file(name: &str, module_name: Option<&str>, folder_id: Option<i64>) -> File {
        File {
            id: 42,
            name: name.to_string(),
            download_url: String::new(),
            module_name: module_name.map(str::to_string),
            folder_id,
            course_id: 1,
            updated_at: naive_timestamp("2024-01-01T00:00:00Z").unwrap(),
            saved_at: None,
        }
    }

    #[test]
    fn slugify_collapses_whitespace_and_reserved_characters() {
        assert_eq!(slugify("Intro 101"), "intro-101");
        assert_eq!(slugify("  What?  Why: <now> "), "what-why-now");
        assert_eq!(slugify("a / b \\ c"), "a-b-c");
    }

    #[test]
    fn slugify_strips_accents_and_non_ascii() {
        assert_eq!(slugify("Cálculo Diferencial"), "calculo-diferencial");
        assert_eq!(slugify("日本語 Notes"), "notes");
    }

    #[test]
    fn slugify_trims_dots_and_dashes_at_the_edges() {
        assert_eq!(slugify("...hidden-"), "hidden");
        assert_eq!(slugify("Lecture 1.PDF"), "lecture-1.pdf");
        assert_eq!(slugify(".."), EMPTY_SLUG);
        assert_eq!(slugify(""), EMPTY_SLUG);
    }

    #[test]
    fn slugify_is_idempotent() {
        for raw in ["Intro 101", "Week 3 -- Slides.pptx", "Ünïcödé file?.txt"] {
            let once = slugify(raw);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn external_url_lands_under_module() {
        let resolver = PathResolver::new("canvas");
        let link = ExternalUrl {
            id: 7,
            url: "https://example.com".to_string(),
            title: "Welcome".to_string(),
            module_name: "Syllabus".to_string(),
            course_id: 1,
            updated_at: naive_timestamp("2024-01-01T00:00:00Z").unwrap(),
            saved_at: None,
        };
        assert_eq!(
            resolver.external_url_path(&course("Intro 101"), &link),
            PathBuf::from("canvas/intro-101/syllabus/welcome.html")
        );
    }

    #[test]
    fn folder_files_follow_folder_hierarchy() {
        let resolver = PathResolver::new("canvas");
        let folder = Folder {
            id: 5,
            full_name: "course files/Week 1".to_string(),
            files_count: 1,
            parent_id: Some(4),
            course_id: 1,
            updated_at: naive_timestamp("2024-01-01T00:00:00Z").unwrap(),
            saved_at: None,
        };
        let path = resolver.file_path(
            &course("Intro 101"),
            Some(&folder),
            &file("Slides 1.pdf", None, Some(5)),
        );
        assert_eq!(
            path,
            PathBuf::from("canvas/intro-101/course-files/week-1/slides-1.pdf")
        );
    }

    #[test]
    fn module_and_loose_files_sit_under_the_course() {
        let resolver = PathResolver::new("canvas");
        let c = course("Intro 101");
        assert_eq!(
            resolver.file_path(&c, None, &file("Reading.pdf", Some("Week 2"), None)),
            PathBuf::from("canvas/intro-101/reading.pdf")
        );
        assert_eq!(
            resolver.file_path(&c, None, &file("Reading.pdf", None, None)),
            PathBuf::from("canvas/intro-101/reading.pdf")
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let resolver = PathResolver::new("/srv/sync");
        let first = resolver.resolve("Intro 101", ["Week 1", "Extra"], "Notes.txt");
        let second = resolver.resolve("Intro 101", ["Week 1", "Extra"], "Notes.txt");
        assert_eq!(first, second);
        assert_eq!(first, PathBuf::from("/srv/sync/intro-101/week-1/extra/notes.txt"));
    }
}
