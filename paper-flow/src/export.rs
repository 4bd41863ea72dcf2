//! Pure rendering of the current result set into a portable text document.
//! The file-save side effect belongs to the caller.

use crate::results::ResultSet;

/// A rendered export: derived filename plus the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub filename: String,
    pub content: String,
}

/// Render the held results. Returns `None` when no document info has arrived
/// yet; there is nothing meaningful to export before that.
pub fn render(results: &ResultSet) -> Option<ExportDocument> {
    let info = results.document_info.as_ref()?;

    let mut out = String::new();
    out.push_str(&info.title);
    out.push('\n');
    if !info.authors.is_empty() {
        out.push_str(&format!("Authors: {}\n", info.authors.join(", ")));
    }
    if let Some(year) = info.year {
        out.push_str(&format!("Year: {year}\n"));
    }

    if let Some(understanding) = &results.understanding {
        if !understanding.problem_statement.is_empty() {
            out.push_str("\nProblem Statement\n");
            out.push_str(&understanding.problem_statement);
            out.push('\n');
        }
    }

    if !results.key_takeaways.is_empty() {
        out.push_str("\nKey Takeaways\n");
        for (i, takeaway) in results.key_takeaways.iter().enumerate() {
            if takeaway.section_reference.is_empty() {
                out.push_str(&format!("{}. {}\n", i + 1, takeaway.point));
            } else {
                out.push_str(&format!(
                    "{}. {} ({})\n",
                    i + 1,
                    takeaway.point,
                    takeaway.section_reference
                ));
            }
        }
    }

    if !results.recommendations.is_empty() {
        out.push_str("\nRelated Papers\n");
        for recommendation in &results.recommendations {
            match recommendation.year {
                Some(year) => out.push_str(&format!("- {} ({})\n", recommendation.title, year)),
                None => out.push_str(&format!("- {}\n", recommendation.title)),
            }
        }
    }

    Some(ExportDocument {
        filename: format!("{}.txt", sanitize_filename(&info.title)),
        content: out,
    })
}

/// Every non-alphanumeric character becomes an underscore.
fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{DocumentInfo, KeyTakeaway, Recommendation};

    fn results_with_title(title: &str) -> ResultSet {
        ResultSet {
            document_info: Some(DocumentInfo {
                title: title.to_string(),
                authors: vec!["A. Vaswani".to_string(), "N. Shazeer".to_string()],
                abstract_text: String::new(),
                year: Some(2017),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn no_document_info_produces_no_artifact() {
        assert!(render(&ResultSet::default()).is_none());
    }

    #[test]
    fn title_is_the_first_line() {
        let export = render(&results_with_title("Attention Is All You Need")).unwrap();
        assert_eq!(
            export.content.lines().next(),
            Some("Attention Is All You Need")
        );
    }

    #[test]
    fn filename_replaces_non_alphanumerics() {
        let export = render(&results_with_title("Attention Is All You Need")).unwrap();
        assert_eq!(export.filename, "Attention_Is_All_You_Need.txt");
    }

    #[test]
    fn sections_render_when_present() {
        let mut results = results_with_title("Some Paper");
        results.key_takeaways = vec![KeyTakeaway {
            point: "Self-attention replaces recurrence".to_string(),
            section_reference: "Section 3".to_string(),
        }];
        results.recommendations = vec![Recommendation {
            rank: 1,
            title: "BERT".to_string(),
            authors: String::new(),
            year: Some(2018),
            source: String::new(),
            paper_id: String::new(),
            relevance_score: 0.0,
            relevance_explanation: String::new(),
            abstract_snippet: String::new(),
        }];

        let export = render(&results).unwrap();
        assert!(export.content.contains("Key Takeaways"));
        assert!(export.content.contains("1. Self-attention replaces recurrence (Section 3)"));
        assert!(export.content.contains("- BERT (2018)"));
    }
}
