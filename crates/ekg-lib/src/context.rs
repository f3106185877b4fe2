//! Plain-text patient summary that downstream conversational tools consume.
//! The ECG label is embedded as free text; nothing here depends on it.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Write;

/// Consultation record. The French keys used by the intake form are accepted
/// as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientInfo {
    #[serde(alias = "nom")]
    pub name: String,
    /// Free text as typed on the intake form; numbers are accepted too and an
    /// empty string means unknown.
    #[serde(deserialize_with = "age_from_text_or_number")]
    pub age: Option<String>,
    #[serde(alias = "genre")]
    pub sex: String,
    pub profession: String,
    #[serde(alias = "motif")]
    pub complaint: String,
    #[serde(alias = "histoire")]
    pub history: String,
    #[serde(alias = "antecedents")]
    pub past_history: String,
    #[serde(alias = "examen")]
    pub clinical_exam: String,
    #[serde(alias = "biologie")]
    pub blood_work: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AgeField {
    Text(String),
    Years(u64),
    Fractional(f64),
}

fn age_from_text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let age = match Option::<AgeField>::deserialize(deserializer)? {
        None => None,
        Some(AgeField::Text(text)) => Some(text.trim().to_string()),
        Some(AgeField::Years(years)) => Some(years.to_string()),
        Some(AgeField::Fractional(years)) => Some(years.to_string()),
    };
    Ok(age.filter(|a| !a.is_empty()))
}

pub fn medical_context(patient: &PatientInfo, ecg_label: Option<&str>) -> String {
    let age = match patient.age.as_deref() {
        Some(a) if a.chars().all(|c| c.is_ascii_digit()) => format!("{} years", a),
        Some(a) => a.to_string(),
        None => String::new(),
    };
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "Patient:\n\
         - Name: {}\n\
         - Age: {}\n\
         - Sex: {}\n\
         - Profession: {}\n\
         \n\
         Consultation:\n\
         - Reason for visit: {}\n\
         - History of present illness: {}\n\
         - Past medical history: {}\n\
         - Clinical examination: {}\n\
         - Blood work: {}\n",
        patient.name,
        age,
        patient.sex,
        patient.profession,
        patient.complaint,
        patient.history,
        patient.past_history,
        patient.clinical_exam,
        patient.blood_work,
    );
    if let Some(label) = ecg_label {
        let _ = writeln!(out, "- ECG (lead II, automated rhythm classification): {}", label);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_intake_form_keys() {
        let patient: PatientInfo = serde_json::from_str(
            r#"{"nom":"A. Diallo","age":54,"genre":"F","motif":"palpitations","biologie":"Hb 11.2"}"#,
        )
        .unwrap();
        assert_eq!(patient.name, "A. Diallo");
        assert_eq!(patient.complaint, "palpitations");
        assert_eq!(patient.age.as_deref(), Some("54"));
    }

    #[test]
    fn intake_form_sends_age_as_text() {
        let patient: PatientInfo = serde_json::from_str(r#"{"nom":"A","age":"54"}"#).unwrap();
        assert_eq!(patient.age.as_deref(), Some("54"));
        assert!(medical_context(&patient, None).contains("- Age: 54 years\n"));

        let patient: PatientInfo = serde_json::from_str(r#"{"nom":"A","age":""}"#).unwrap();
        assert_eq!(patient.age, None);
        assert!(medical_context(&patient, None).contains("- Age: \n"));

        let patient: PatientInfo = serde_json::from_str(r#"{"age":null}"#).unwrap();
        assert_eq!(patient.age, None);
    }

    #[test]
    fn label_is_embedded_verbatim() {
        let patient = PatientInfo {
            name: "B".into(),
            ..PatientInfo::default()
        };
        let text = medical_context(&patient, Some("Atrial fibrillation"));
        assert!(text.contains("- Name: B\n"));
        assert!(text.ends_with("automated rhythm classification): Atrial fibrillation\n"));
        assert!(!medical_context(&patient, None).contains("ECG"));
    }
}
