// Labeling configs, one per project type. Every config annotates `$document_text`.

use crate::document::FieldStore;
use crate::models::annotation::ProjectType;

const RESUME_SECTIONS: [&str; 12] = [
    "name",
    "contact",
    "address",
    "objective",
    "education",
    "experience",
    "skills",
    "projects",
    "achievements",
    "languages",
    "co_curricular",
    "personal",
];

/// Section for resume fields that match none of [`RESUME_SECTIONS`].
pub const OTHER_SECTION: &str = "other";

const RESUME_CONFIG_TAIL: &str = r#"  <TextArea name="corrections" toName="document_text" placeholder="Enter any corrections or additional information"/>
  <Rating name="parsing_accuracy" toName="document_text" hotkey="r" maxRating="5"/>
</View>"#;

const SKILLS_CONFIG: &str = r#"<View>
  <Text name="document_text" value="$document_text"/>
  <Labels name="skill_labels" toName="document_text">
    <Label value="Programming Language" background="red"/>
    <Label value="Framework" background="blue"/>
    <Label value="Database" background="green"/>
    <Label value="Tool" background="orange"/>
    <Label value="Platform" background="purple"/>
    <Label value="Methodology" background="yellow"/>
  </Labels>
  <Choices name="skill_level" toName="document_text" showInLine="true">
    <Choice value="Beginner"/>
    <Choice value="Intermediate"/>
    <Choice value="Advanced"/>
    <Choice value="Expert"/>
  </Choices>
  <TextArea name="skill_notes" toName="document_text" placeholder="Additional notes about skills"/>
</View>"#;

const EDUCATION_CONFIG: &str = r#"<View>
  <Text name="document_text" value="$document_text"/>
  <Choices name="degree_type" toName="document_text" showInLine="true">
    <Choice value="Bachelor"/>
    <Choice value="Master"/>
    <Choice value="PhD"/>
    <Choice value="Diploma"/>
    <Choice value="Certificate"/>
    <Choice value="Other"/>
  </Choices>
  <TextArea name="institution" toName="document_text" placeholder="Institution name"/>
  <TextArea name="field_of_study" toName="document_text" placeholder="Field of study"/>
  <TextArea name="graduation_year" toName="document_text" placeholder="Graduation year"/>
  <Rating name="data_quality" toName="document_text" hotkey="r" maxRating="5"/>
</View>"#;

/// Label used by the generic config when no fields were extracted.
pub const FALLBACK_LABEL: &str = "General_Text";

const PALETTE: [&str; 8] = [
    "red", "blue", "green", "orange", "purple", "brown", "teal", "magenta",
];

pub fn labeling_config(project_type: ProjectType, fields: &FieldStore) -> String {
    match project_type {
        ProjectType::Resume => resume_config(),
        ProjectType::Skills => SKILLS_CONFIG.to_string(),
        ProjectType::Education => EDUCATION_CONFIG.to_string(),
        ProjectType::Generic => generic_config(fields),
    }
}

fn resume_config() -> String {
    let labels = label_block("section_labels", RESUME_SECTIONS.iter().copied());
    let mut choices =
        String::from("  <Choices name=\"section_type\" toName=\"document_text\" showInLine=\"true\">\n");
    for section in RESUME_SECTIONS.iter().chain(std::iter::once(&OTHER_SECTION)) {
        choices.push_str(&format!("    <Choice value=\"{section}\"/>\n"));
    }
    choices.push_str("  </Choices>\n");
    format!(
        "<View>\n  <Text name=\"document_text\" value=\"$document_text\"/>\n{labels}{choices}{RESUME_CONFIG_TAIL}"
    )
}

/// Resume section a field belongs to: `Work Experience` is `experience`, `Email` is `other`.
pub fn resume_section(field_name: &str) -> &'static str {
    let key: String = field_name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();

    if let Some(exact) = RESUME_SECTIONS.iter().find(|s| **s == key) {
        return *exact;
    }
    // `name` is tried last since many field names end in it.
    RESUME_SECTIONS
        .iter()
        .skip(1)
        .chain(RESUME_SECTIONS.iter().take(1))
        .find(|s| key.contains(*s))
        .copied()
        .unwrap_or(OTHER_SECTION)
}

/// One span label per extracted field name.
fn generic_config(fields: &FieldStore) -> String {
    let names: Vec<&str> = fields.names().collect();
    let labels = if names.is_empty() {
        label_block("field_labels", std::iter::once(FALLBACK_LABEL))
    } else {
        label_block("field_labels", names.into_iter())
    };
    format!(
        "<View>\n  <Text name=\"document_text\" value=\"$document_text\"/>\n{labels}  \
         <TextArea name=\"corrections\" toName=\"document_text\" placeholder=\"Enter any corrections\"/>\n  \
         <Rating name=\"parsing_accuracy\" toName=\"document_text\" hotkey=\"r\" maxRating=\"5\"/>\n</View>"
    )
}

fn label_block<'a>(name: &str, values: impl Iterator<Item = &'a str>) -> String {
    let mut out = format!("  <Labels name=\"{name}\" toName=\"document_text\">\n");
    for (i, value) in values.enumerate() {
        out.push_str(&format!(
            "    <Label value=\"{}\" background=\"{}\"/>\n",
            escape_xml(value),
            PALETTE[i % PALETTE.len()]
        ));
    }
    out.push_str("  </Labels>\n");
    out
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_config_labels_fields() {
        let mut fields = FieldStore::new();
        fields.set("Name", Some("Jane".into()));
        fields.set("R&D \"Lab\"", Some("x".into()));

        let config = labeling_config(ProjectType::Generic, &fields);

        assert!(config.contains(r#"<Label value="Name" background="red"/>"#));
        assert!(config.contains(r#"<Label value="R&amp;D &quot;Lab&quot;" background="blue"/>"#));
        assert!(!config.contains(FALLBACK_LABEL));
    }

    #[test]
    fn test_generic_config_fallback_label() {
        let config = labeling_config(ProjectType::Generic, &FieldStore::new());
        assert!(config.contains(r#"<Label value="General_Text""#));
    }

    #[test]
    fn test_resume_choices_cover_every_section() {
        let config = labeling_config(ProjectType::Resume, &FieldStore::new());
        for section in RESUME_SECTIONS.iter().chain(std::iter::once(&OTHER_SECTION)) {
            assert!(
                config.contains(&format!("<Choice value=\"{section}\"/>")),
                "{section}"
            );
        }
    }

    #[test]
    fn test_resume_section_for_field_names() {
        assert_eq!(resume_section("Name"), "name");
        assert_eq!(resume_section("Contact Information"), "contact");
        assert_eq!(resume_section("Work Experience"), "experience");
        assert_eq!(resume_section("technical_skills"), "skills");
        assert_eq!(resume_section("Co-Curricular"), "co_curricular");
        assert_eq!(resume_section("Email"), OTHER_SECTION);
    }

    #[test]
    fn test_every_config_binds_document_text() {
        for kind in [
            ProjectType::Generic,
            ProjectType::Resume,
            ProjectType::Skills,
            ProjectType::Education,
        ] {
            let config = labeling_config(kind, &FieldStore::new());
            assert!(config.starts_with("<View>"), "{kind:?}");
            assert!(config.ends_with("</View>"), "{kind:?}");
            assert!(config.contains("value=\"$document_text\""), "{kind:?}");
        }
    }
}
