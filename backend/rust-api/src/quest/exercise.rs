use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

/// Placeholder marking a blank slot inside a fill-in-the-blank template.
pub const BLANK_MARKER: &str = "___";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestMode {
    Typing,
    #[serde(rename = "fill")]
    FillBlank,
}

impl QuestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestMode::Typing => "typing",
            QuestMode::FillBlank => "fill",
        }
    }
}

impl fmt::Display for QuestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one exercise; renders as `{mode}-{language}-{index}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExerciseKey {
    pub mode: QuestMode,
    pub language: String,
    pub index: usize,
}

impl fmt::Display for ExerciseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.mode, self.language, self.index)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExerciseError {
    #[error("template has {markers} blank markers but {answers} expected answers")]
    BlankCountMismatch { markers: usize, answers: usize },
    #[error("unknown language {0:?}")]
    UnknownLanguage(String),
    #[error("no {mode} exercise #{index} for {language}")]
    NotFound {
        mode: QuestMode,
        language: String,
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingExercise {
    pub language: String,
    pub index: usize,
    pub snippet: String,
}

/// One piece of a rendered template line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart<'a> {
    Text(&'a str),
    Blank(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillBlankExercise {
    pub language: String,
    pub index: usize,
    pub template: String,
    pub blanks: Vec<String>,
}

impl FillBlankExercise {
    pub fn new(
        language: impl Into<String>,
        index: usize,
        template: impl Into<String>,
        blanks: Vec<String>,
    ) -> Result<Self, ExerciseError> {
        let template = template.into();
        let markers = template.matches(BLANK_MARKER).count();
        if markers != blanks.len() {
            return Err(ExerciseError::BlankCountMismatch {
                markers,
                answers: blanks.len(),
            });
        }
        Ok(Self {
            language: language.into(),
            index,
            template,
            blanks,
        })
    }

    /// Splits the template into lines of text and numbered blank slots.
    /// Slots are numbered in reading order across the whole template.
    pub fn lines(&self) -> Vec<Vec<TemplatePart<'_>>> {
        let mut slot = 0;
        self.template
            .lines()
            .map(|line| {
                let mut parts = Vec::new();
                let mut segments = line.split(BLANK_MARKER).peekable();
                while let Some(segment) = segments.next() {
                    if !segment.is_empty() {
                        parts.push(TemplatePart::Text(segment));
                    }
                    if segments.peek().is_some() {
                        parts.push(TemplatePart::Blank(slot));
                        slot += 1;
                    }
                }
                parts
            })
            .collect()
    }

    /// Template text with each blank replaced by the given answer, or by
    /// `[n]` when the answer is missing or empty.
    pub fn render_with<S: AsRef<str>>(&self, answers: &[S]) -> String {
        self.lines()
            .into_iter()
            .map(|parts| {
                parts
                    .into_iter()
                    .map(|part| match part {
                        TemplatePart::Text(text) => text.to_string(),
                        TemplatePart::Blank(slot) => match answers.get(slot) {
                            Some(answer) if !answer.as_ref().is_empty() => {
                                answer.as_ref().to_string()
                            }
                            _ => format!("[{}]", slot + 1),
                        },
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exercise {
    Typing(TypingExercise),
    FillBlank(FillBlankExercise),
}

impl Exercise {
    pub fn mode(&self) -> QuestMode {
        match self {
            Exercise::Typing(_) => QuestMode::Typing,
            Exercise::FillBlank(_) => QuestMode::FillBlank,
        }
    }

    pub fn language(&self) -> &str {
        match self {
            Exercise::Typing(ex) => &ex.language,
            Exercise::FillBlank(ex) => &ex.language,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Exercise::Typing(ex) => ex.index,
            Exercise::FillBlank(ex) => ex.index,
        }
    }

    pub fn key(&self) -> ExerciseKey {
        ExerciseKey {
            mode: self.mode(),
            language: self.language().to_string(),
            index: self.index(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct LanguagePack {
    snippets: Vec<String>,
    templates: Vec<(String, Vec<String>)>,
}

/// Static set of exercises, grouped by language tag.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    languages: BTreeMap<String, LanguagePack>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let mut catalog = Catalog::default();

        catalog.add_snippets(
            "java",
            [
                r#"for (int i = 0; i < n; i++) { System.out.println(arr[i]); }"#,
                r#"if (x > 0) { return x * factorial(x - 1); } else { return 1; }"#,
                r#"List<String> names = Arrays.asList("Alice","Bob","Eve"); names.forEach(System.out::println);"#,
                r#"try { BufferedReader r = new BufferedReader(new FileReader("in.txt")); String line = r.readLine(); r.close(); } catch (Exception e) { e.printStackTrace(); }"#,
            ],
        );
        catalog.add_template(
            "java",
            "public class Main {\n  public static void main(String[] args) {\n    int sum = 0;\n    int[] data = {1, 2, 3, 4};\n    // fill blanks below\n    for (int i = 0; i < ___; i++) {\n      sum += ___;\n    }\n    System.out.println(sum);\n  }\n}",
            ["data.length", "data[i]"],
        );

        catalog.add_snippets(
            "python",
            [
                "for i, item in enumerate(items): print(i, item)",
                "squares = [x * x for x in range(10) if x % 2 == 0]",
                "with open(\"in.txt\") as f: lines = [line.strip() for line in f]",
            ],
        );
        catalog.add_template(
            "python",
            "def total(data):\n    result = 0\n    for value in ___:\n        result += ___\n    return result",
            ["data", "value"],
        );

        catalog
    }

    pub fn add_snippets<I, S>(&mut self, language: &str, snippets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages
            .entry(language.to_string())
            .or_default()
            .snippets
            .extend(snippets.into_iter().map(Into::into));
    }

    /// Adds a template; the blank markers are counted when the exercise is
    /// materialized, so a mismatched template surfaces as an error there.
    pub fn add_template<I, S>(&mut self, language: &str, template: &str, blanks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages
            .entry(language.to_string())
            .or_default()
            .templates
            .push((
                template.to_string(),
                blanks.into_iter().map(Into::into).collect(),
            ));
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    pub fn count(&self, mode: QuestMode, language: &str) -> usize {
        self.languages
            .get(language)
            .map(|pack| match mode {
                QuestMode::Typing => pack.snippets.len(),
                QuestMode::FillBlank => pack.templates.len(),
            })
            .unwrap_or(0)
    }

    pub fn exercise(
        &self,
        mode: QuestMode,
        language: &str,
        index: usize,
    ) -> Result<Exercise, ExerciseError> {
        let pack = self
            .languages
            .get(language)
            .ok_or_else(|| ExerciseError::UnknownLanguage(language.to_string()))?;
        let not_found = || ExerciseError::NotFound {
            mode,
            language: language.to_string(),
            index,
        };

        match mode {
            QuestMode::Typing => {
                let snippet = pack.snippets.get(index).ok_or_else(not_found)?;
                Ok(Exercise::Typing(TypingExercise {
                    language: language.to_string(),
                    index,
                    snippet: snippet.clone(),
                }))
            }
            QuestMode::FillBlank => {
                let (template, blanks) = pack.templates.get(index).ok_or_else(not_found)?;
                FillBlankExercise::new(language, index, template.as_str(), blanks.clone())
                    .map(Exercise::FillBlank)
            }
        }
    }
}
