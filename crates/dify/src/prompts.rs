//! Fixed instruction text sent with each request.

/// Ask for structured metadata of one AMA-style reference.
pub fn reference_metadata(reference: &str) -> String {
    format!(
        r#"You extract bibliographic metadata from references written in AMA style.
From the reference below, extract:
- article title
- author list
- journal name
- publication year
- URL (if present)

Answer with this JSON object only, nothing else:
{{
    "title": "",
    "authors": "",
    "journal": "",
    "year": "",
    "url": ""
}}

Reference: {reference}
"#
    )
}

/// Ask for every cited sentence on a page screenshot and its reference numbers.
pub const CITATION_EXTRACTION: &str = r#"You will receive a screenshot of a page from an English-language medical journal article in AMA style. The text cites references with superscript numbers.
Read the page and extract every sentence that carries a citation, together with the reference numbers it cites.

Answer strictly as a JSON array, for example:
[
    {
        "id": 1,
        "reference_id": [1],
        "reference_text": "The available evidence from four randomized trials (NSABP B-39/RTOG 0413)."
    },
    {
        "id": 2,
        "reference_id": [2, 3, 4],
        "reference_text": "The use of at least a 2-mm margin in DCIS treated with WBRT is associated with low rates of IBTR."
    }
]

Do not skip any cited sentence, and keep each sentence matched to the right reference numbers.

The page screenshot follows:
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_is_embedded() {
        let prompt = reference_metadata("1. Smith J. Title. JAMA. 2020;1:2.");
        assert!(prompt.ends_with("Reference: 1. Smith J. Title. JAMA. 2020;1:2.\n"));
        assert!(prompt.contains("\"journal\": \"\""));
    }
}
