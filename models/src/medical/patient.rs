// models/src/medical/patient.rs

//! The patient membership record.
//!
//! A [`Patient`] is a plain data holder; persistence lives behind the store
//! trait in the `rest_api` crate. Decoding from a JSON body validates every
//! field up front: a record either deserializes completely or the whole
//! request is rejected, so a half-valid patient never reaches a store.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use email_address::EmailAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};

use crate::errors::{ValidationError, ValidationResult};

// Postal code and home phone formats, compiled once.
static ZIP_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{5}(?:-[0-9]{4})?$").unwrap());
static PHONE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\([0-9]{3}\) [0-9]{3}-[0-9]{4}$").unwrap());

/// Enumeration of valid genders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// The symbolic name used on the wire under the `sex` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "Unknown",
        }
    }
}

impl FromStr for Gender {
    type Err = ValidationError;

    // Names are matched case-sensitively: "male" is not a gender.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Unknown" => Ok(Gender::Unknown),
            other => Err(ValidationError::InvalidGender(other.to_string())),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patient in the membership list.
///
/// `id` stays `None` until the store assigns one at creation; it is never
/// taken from a request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patient {
    pub id: Option<i32>,
    pub title: Option<String>,
    pub fname: String,
    pub mname: Option<String>,
    pub lname: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub state: String,
    pub phone_home: String,
    pub email: Option<String>,
    pub dob: NaiveDate,
    pub gender: Gender,
}

impl Patient {
    /// Serializes a patient into a JSON object under the canonical wire keys.
    ///
    /// Never fails; the record is assumed valid. `DOB` is emitted as
    /// `YYYY-MM-DD` and `gender` under the `sex` key as its symbolic name.
    pub fn serialize(&self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "fname": self.fname,
            "mname": self.mname,
            "lname": self.lname,
            "street": self.street,
            "postal_code": self.postal_code,
            "city": self.city,
            "state": self.state,
            "phone_home": self.phone_home,
            "email": self.email,
            "DOB": self.dob.format("%Y-%m-%d").to_string(),
            "sex": self.gender.as_str(),
        })
    }

    /// Deserializes a patient from a JSON object, validating every field.
    ///
    /// Populates `self` in place and returns it, so an existing record can be
    /// overwritten by an update request. Identical input always produces the
    /// same record. The `id` key is ignored; ids only come from the store.
    pub fn deserialize(&mut self, data: &Value) -> ValidationResult<&mut Self> {
        let data = data.as_object().ok_or(ValidationError::MalformedBody)?;

        self.title = optional_string(data, "title");
        let fname = required_string(data, "fname")?;
        if fname.is_empty() {
            return Err(ValidationError::MissingField("fname"));
        }
        self.fname = fname;
        self.mname = optional_string(data, "mname");
        let lname = required_string(data, "lname")?;
        if lname.is_empty() {
            return Err(ValidationError::MissingField("lname"));
        }
        self.lname = lname;
        self.street = required_string(data, "street")?;

        let postal_code = required_string(data, "postal_code")?;
        if !ZIP_CODE.is_match(&postal_code) {
            return Err(ValidationError::InvalidPostalCode(postal_code));
        }
        self.postal_code = postal_code;

        self.city = required_string(data, "city")?;
        self.state = required_string(data, "state")?;

        let phone_home = required_string(data, "phone_home")?;
        if !PHONE_NUMBER.is_match(&phone_home) {
            return Err(ValidationError::InvalidPhone(phone_home));
        }
        self.phone_home = phone_home;

        // An absent or empty email is fine; a present one must parse, and the
        // normalized form is what gets stored.
        self.email = None;
        if let Some(raw) = optional_string(data, "email").filter(|e| !e.is_empty()) {
            let parsed = EmailAddress::from_str(&raw)
                .map_err(|_| ValidationError::InvalidEmail(raw))?;
            self.email = Some(parsed.to_string());
        }

        let dob = required_string(data, "DOB")?;
        self.dob = NaiveDate::parse_from_str(&dob, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(dob))?;

        self.gender = required_string(data, "sex")?.parse()?;

        Ok(self)
    }
}

/// Looks up a required string field. Absence and JSON null both count as
/// missing; a non-string value is the malformed-body case.
fn required_string(data: &Map<String, Value>, field: &'static str) -> ValidationResult<String> {
    match data.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ValidationError::MalformedBody),
    }
}

/// Looks up an optional string field; null and non-string values are
/// tolerated and stored as absent.
fn optional_string(data: &Map<String, Value>, field: &str) -> Option<String> {
    data.get(field).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{Gender, Patient};
    use crate::errors::ValidationError;
    use chrono::NaiveDate;
    use serde_json::{Value, json};

    fn sample_record() -> Value {
        json!({
            "fname": "Richard",
            "lname": "Jones",
            "street": "400 West Broadway",
            "postal_code": "92101",
            "city": "San Diego",
            "state": "CA",
            "phone_home": "(619) 555-5555",
            "email": "richard@pennfirm.com",
            "DOB": "1940-12-16",
            "sex": "Male",
        })
    }

    fn decode(data: &Value) -> Patient {
        let mut pat = Patient::default();
        pat.deserialize(data).expect("sample record should be valid");
        pat
    }

    #[test]
    fn should_deserialize_a_patient() {
        let pat = decode(&sample_record());
        assert_eq!(pat.id, None);
        assert_eq!(pat.fname, "Richard");
        assert_eq!(pat.lname, "Jones");
        assert_eq!(pat.street, "400 West Broadway");
        assert_eq!(pat.state, "CA");
        assert_eq!(pat.email.as_deref(), Some("richard@pennfirm.com"));
        assert_eq!(pat.dob, NaiveDate::from_ymd_opt(1940, 12, 16).unwrap());
        assert_eq!(pat.gender, Gender::Male);
    }

    #[test]
    fn should_serialize_a_patient() {
        let pat = Patient {
            id: None,
            title: Some("Ms.".to_string()),
            fname: "Daisy".to_string(),
            mname: None,
            lname: "Dog".to_string(),
            street: "2000 Highland".to_string(),
            postal_code: "98765".to_string(),
            city: "Hayward".to_string(),
            state: "CA".to_string(),
            phone_home: "(510) 793-9896".to_string(),
            email: Some("dog@us.ibm.com".to_string()),
            dob: NaiveDate::from_ymd_opt(2010, 10, 9).unwrap(),
            gender: Gender::Female,
        };
        let data = pat.serialize();
        assert_eq!(data["id"], Value::Null);
        assert_eq!(data["title"], "Ms.");
        assert_eq!(data["fname"], "Daisy");
        assert_eq!(data["mname"], Value::Null);
        assert_eq!(data["postal_code"], "98765");
        assert_eq!(data["phone_home"], "(510) 793-9896");
        assert_eq!(data["DOB"], "2010-10-09");
        assert_eq!(data["sex"], "Female");
    }

    #[test]
    fn should_round_trip_a_valid_record() {
        let input = sample_record();
        let pat = decode(&input);
        let output = pat.serialize();
        for key in [
            "fname", "lname", "street", "postal_code", "city", "state", "phone_home", "email",
            "DOB", "sex",
        ] {
            assert_eq!(output[key], input[key], "field {key} should survive the round trip");
        }
        assert_eq!(output["id"], Value::Null);
    }

    #[test]
    fn should_serialize_identically_twice() {
        let pat = decode(&sample_record());
        assert_eq!(pat.serialize(), pat.serialize());
    }

    #[test]
    fn should_deserialize_identically_twice() {
        let input = sample_record();
        let first = decode(&input);
        let mut second = first.clone();
        second.deserialize(&input).expect("second decode of the same input");
        assert_eq!(first, second);
    }

    #[test]
    fn should_reject_each_missing_required_field() {
        for field in [
            "fname", "lname", "street", "postal_code", "city", "state", "phone_home", "DOB", "sex",
        ] {
            let mut data = sample_record();
            data.as_object_mut().unwrap().remove(field);
            let err = Patient::default().deserialize(&data).unwrap_err();
            assert_eq!(err, ValidationError::MissingField(field));
        }
    }

    #[test]
    fn should_treat_null_required_field_as_missing() {
        let mut data = sample_record();
        data["lname"] = Value::Null;
        let err = Patient::default().deserialize(&data).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("lname"));
    }

    #[test]
    fn should_reject_empty_first_name() {
        let mut data = sample_record();
        data["fname"] = json!("");
        let err = Patient::default().deserialize(&data).unwrap_err();
        assert_eq!(err, ValidationError::MissingField("fname"));
    }

    #[test]
    fn should_reject_bad_postal_codes() {
        for bad in ["921155", "9210", "92101-12", "92101-12345", "9210a", "92101 1234"] {
            let mut data = sample_record();
            data["postal_code"] = json!(bad);
            let err = Patient::default().deserialize(&data).unwrap_err();
            assert_eq!(err, ValidationError::InvalidPostalCode(bad.to_string()));
        }
    }

    #[test]
    fn should_accept_extended_postal_code() {
        let mut data = sample_record();
        data["postal_code"] = json!("92101-1234");
        let pat = decode(&data);
        assert_eq!(pat.postal_code, "92101-1234");
    }

    #[test]
    fn should_reject_bad_phone_numbers() {
        for bad in [
            "(619)555-5555",
            "619 555-5555",
            "(619) 555 5555",
            "(619) 5555-555",
            "(61) 555-5555",
            "619-555-5555",
        ] {
            let mut data = sample_record();
            data["phone_home"] = json!(bad);
            let err = Patient::default().deserialize(&data).unwrap_err();
            assert_eq!(err, ValidationError::InvalidPhone(bad.to_string()));
        }
    }

    #[test]
    fn should_reject_bad_email() {
        let mut data = sample_record();
        data["email"] = json!("not an email");
        let err = Patient::default().deserialize(&data).unwrap_err();
        assert_eq!(err, ValidationError::InvalidEmail("not an email".to_string()));
    }

    #[test]
    fn should_tolerate_absent_null_or_empty_email() {
        for data in [
            {
                let mut d = sample_record();
                d.as_object_mut().unwrap().remove("email");
                d
            },
            {
                let mut d = sample_record();
                d["email"] = Value::Null;
                d
            },
            {
                let mut d = sample_record();
                d["email"] = json!("");
                d
            },
        ] {
            let pat = decode(&data);
            assert_eq!(pat.email, None);
        }
    }

    #[test]
    fn should_reject_bad_dates() {
        for bad in ["1940-13-16", "1940-12-32", "12/16/1940", "1940-12", "not-a-date"] {
            let mut data = sample_record();
            data["DOB"] = json!(bad);
            let err = Patient::default().deserialize(&data).unwrap_err();
            assert_eq!(err, ValidationError::InvalidDate(bad.to_string()));
        }
    }

    #[test]
    fn should_reject_unknown_gender_names() {
        for bad in ["male", "FEMALE", "M", "Other", ""] {
            let mut data = sample_record();
            data["sex"] = json!(bad);
            let err = Patient::default().deserialize(&data).unwrap_err();
            assert_eq!(err, ValidationError::InvalidGender(bad.to_string()));
        }
    }

    #[test]
    fn should_reject_non_object_bodies() {
        for data in [json!([1, 2, 3]), json!("patient"), json!(42), Value::Null] {
            let err = Patient::default().deserialize(&data).unwrap_err();
            assert_eq!(err, ValidationError::MalformedBody);
        }
    }

    #[test]
    fn should_reject_non_string_required_field() {
        let mut data = sample_record();
        data["postal_code"] = json!(92101);
        let err = Patient::default().deserialize(&data).unwrap_err();
        assert_eq!(err, ValidationError::MalformedBody);
    }

    #[test]
    fn should_tolerate_non_string_optional_field() {
        let mut data = sample_record();
        data["title"] = json!(7);
        let pat = decode(&data);
        assert_eq!(pat.title, None);
    }

    #[test]
    fn should_parse_gender_names() {
        assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!("Unknown".parse::<Gender>().unwrap(), Gender::Unknown);
        assert_eq!(Gender::default(), Gender::Unknown);
        assert_eq!(Gender::Female.to_string(), "Female");
    }
}
