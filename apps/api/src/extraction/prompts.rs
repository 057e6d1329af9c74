// Field extraction LLM prompt templates.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

pub fn extraction_system() -> String {
    format!(
        "{JSON_ONLY_SYSTEM} You extract key information from documents of any kind \
         (resumes, product labels, letters, forms). Never invent values that are not in the text."
    )
}

pub const EXTRACTION_PROMPT: &str = r#"Given the following document text, extract key information and present it as a JSON array.

Identify common document fields such as:
- Name (for resumes/personal documents)
- Contact Information (email, phone, address, links)
- Dates (e.g., Date of Birth, employment dates, project dates, expiry dates)
- Headings/Sections (e.g., Education, Experience, Skills, Objective, Product Name, Ingredients, Instructions, Description, Price, SKU, Manufacturer)
- Key data points relevant to the document type (for a product label: net weight, nutrition facts, barcode; for a resume: degree, university, job title, company, skills listed)

OUTPUT SCHEMA (return exactly this structure, in the order the fields appear in the document):
[
  {
    "field_name": "string: descriptive name of the field (e.g. Name, Email, Education, Skills)",
    "field_value": "string" | ["string"] | [{...}] | {...},
    "type": "personal" | "contact" | "section" | "product_info" | "date" | "list" | "structured_list" | "other",
    "confidence": "High" | "Medium" | "Low"
  }
]

RULES:
1. If a section contains a list (e.g. skills, ingredients), field_value is a JSON array of strings.
2. If a section contains structured items (e.g. multiple jobs, each with title, company, dates), field_value is a JSON array of objects.
3. For general text sections, field_value is the full text.
4. Be as comprehensive as possible.
5. Return ONLY the JSON array and nothing else, no code fences.

DOCUMENT TEXT:
---
{raw_text}
---"#;
