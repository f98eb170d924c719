use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Collections exposed by the school management API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Classes,
    Subjects,
    Students,
    Teachers,
    Exams,
    Grades,
    Fees,
    Notices,
    Timetable,
    Documents,
    Attendance,
}

impl Resource {
    pub const ALL: [Resource; 11] = [
        Resource::Classes,
        Resource::Subjects,
        Resource::Students,
        Resource::Teachers,
        Resource::Exams,
        Resource::Grades,
        Resource::Fees,
        Resource::Notices,
        Resource::Timetable,
        Resource::Documents,
        Resource::Attendance,
    ];

    /// Collection path relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Classes => "/academics/classes/",
            Resource::Subjects => "/academics/subjects/",
            Resource::Exams => "/academics/exams/",
            Resource::Grades => "/academics/grades/",
            Resource::Timetable => "/academics/timetable/",
            Resource::Students => "/students/",
            Resource::Teachers => "/users/teachers/",
            Resource::Fees => "/billing/fees/",
            Resource::Notices => "/messaging/notices/",
            Resource::Documents => "/schools/documents/",
            Resource::Attendance => "/attendance/records/",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Classes => "classes",
            Resource::Subjects => "subjects",
            Resource::Students => "students",
            Resource::Teachers => "teachers",
            Resource::Exams => "exams",
            Resource::Grades => "grades",
            Resource::Fees => "fees",
            Resource::Notices => "notices",
            Resource::Timetable => "timetable",
            Resource::Documents => "documents",
            Resource::Attendance => "attendance",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Resource::Classes => "Classes",
            Resource::Subjects => "Subjects",
            Resource::Students => "Students",
            Resource::Teachers => "Teachers",
            Resource::Exams => "Exams",
            Resource::Grades => "Grades",
            Resource::Fees => "Fees",
            Resource::Notices => "Notices",
            Resource::Timetable => "Timetable",
            Resource::Documents => "Documents",
            Resource::Attendance => "Attendance",
        }
    }

    /// Display fields matched by the client-side search box
    pub fn search_fields(&self) -> &'static [&'static str] {
        match self {
            Resource::Classes => &["name", "section", "teacher_name"],
            Resource::Subjects => &["name", "code", "class_name"],
            Resource::Students => &["first_name", "last_name", "admission_number", "class_name"],
            Resource::Teachers => &["first_name", "last_name", "email", "subject_name"],
            Resource::Exams => &["name", "subject_name", "class_name"],
            Resource::Grades => &["student_name", "subject_name", "exam_name", "grade"],
            Resource::Fees => &["student_name", "description", "status"],
            Resource::Notices => &["title", "content", "audience"],
            Resource::Timetable => &["class_name", "subject_name", "teacher_name", "day"],
            Resource::Documents => &["title", "uploaded_by_name"],
            Resource::Attendance => &["student_name", "class_name", "status", "date"],
        }
    }

    /// Table columns as (field, header)
    pub fn columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Resource::Classes => &[("name", "Name"), ("section", "Section"), ("teacher_name", "Teacher")],
            Resource::Subjects => &[("name", "Name"), ("code", "Code"), ("class_name", "Class")],
            Resource::Students => &[
                ("admission_number", "Adm. No"),
                ("first_name", "First name"),
                ("last_name", "Last name"),
                ("class_name", "Class"),
            ],
            Resource::Teachers => &[
                ("first_name", "First name"),
                ("last_name", "Last name"),
                ("email", "Email"),
                ("subject_name", "Subject"),
            ],
            Resource::Exams => &[
                ("name", "Exam"),
                ("subject_name", "Subject"),
                ("class_name", "Class"),
                ("date", "Date"),
            ],
            Resource::Grades => &[
                ("student_name", "Student"),
                ("subject_name", "Subject"),
                ("exam_name", "Exam"),
                ("score", "Score"),
                ("grade", "Grade"),
            ],
            Resource::Fees => &[
                ("student_name", "Student"),
                ("description", "Description"),
                ("amount", "Amount"),
                ("amount_paid", "Paid"),
                ("due_date", "Due"),
                ("status", "Status"),
            ],
            Resource::Notices => &[("title", "Title"), ("audience", "Audience"), ("created_at", "Posted")],
            Resource::Timetable => &[
                ("day", "Day"),
                ("start_time", "Start"),
                ("end_time", "End"),
                ("class_name", "Class"),
                ("subject_name", "Subject"),
                ("teacher_name", "Teacher"),
            ],
            Resource::Documents => &[("title", "Title"), ("uploaded_by_name", "Uploaded by"), ("created_at", "Date")],
            Resource::Attendance => &[
                ("date", "Date"),
                ("student_name", "Student"),
                ("class_name", "Class"),
                ("status", "Status"),
            ],
        }
    }

    /// Fields that must be non-empty before a create/update is submitted
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Resource::Classes => &["name"],
            Resource::Subjects => &["name", "code"],
            Resource::Students => &["first_name", "last_name", "admission_number"],
            Resource::Teachers => &["first_name", "last_name", "email"],
            Resource::Exams => &["name", "subject", "date"],
            Resource::Grades => &["student", "exam", "score"],
            Resource::Fees => &["student", "amount", "due_date"],
            Resource::Notices => &["title", "content"],
            Resource::Timetable => &["class_id", "subject", "day", "start_time", "end_time"],
            Resource::Documents => &["title"],
            Resource::Attendance => &["student", "date", "status"],
        }
    }

    /// Fields offered by the create/edit form, required ones first
    pub fn form_fields(&self) -> Vec<&'static str> {
        let mut fields: Vec<&'static str> = self.required_fields().to_vec();
        let optional: &[&str] = match self {
            Resource::Classes => &["section", "teacher"],
            Resource::Subjects => &["class_id", "teacher"],
            Resource::Students => &["class_id", "date_of_birth", "email"],
            Resource::Teachers => &["phone", "subject"],
            Resource::Exams => &["class_id", "total_marks"],
            Resource::Grades => &["grade", "remarks"],
            Resource::Fees => &["description", "amount_paid", "status"],
            Resource::Notices => &["audience"],
            Resource::Timetable => &["teacher", "room"],
            Resource::Documents => &["description"],
            Resource::Attendance => &["remarks"],
        };
        fields.extend(optional.iter().copied());
        fields
    }

    /// Singular name, as accepted on the command line ("class", "student")
    pub fn singular(&self) -> &'static str {
        match self {
            Resource::Classes => "class",
            Resource::Subjects => "subject",
            Resource::Students => "student",
            Resource::Teachers => "teacher",
            Resource::Exams => "exam",
            Resource::Grades => "grade",
            Resource::Fees => "fee",
            Resource::Notices => "notice",
            Resource::Timetable => "timetable",
            Resource::Documents => "document",
            Resource::Attendance => "attendance",
        }
    }

    pub fn parse(name: &str) -> Option<Resource> {
        let name = name.trim().to_lowercase();
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == name || r.singular() == name)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backend record: an integer id plus whatever display fields the server sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Build a record from a raw JSON object; `None` when there is no integer id
    pub fn from_value(value: Value) -> Option<Record> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let id = match fields.remove("id")? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        Some(Record { id, fields })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == "id" {
            return None;
        }
        self.fields.get(field)
    }

    /// Field rendered as display text; missing and null render empty
    pub fn text(&self, field: &str) -> String {
        if field == "id" {
            return self.id.to_string();
        }
        match self.fields.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Numeric field, accepting JSON numbers and numeric strings ("1500.00")
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Form pre-filled from this record, used when opening the edit dialog.
    /// Only fields the record actually carries are filled in.
    pub fn to_form(&self, resource: Resource) -> FormData {
        let mut form = FormData::new();
        for field in resource.form_fields() {
            if matches!(self.get(field), None | Some(Value::Null)) {
                continue;
            }
            form.set(field, &self.text(field));
            form.prefilled.insert(field.to_string());
        }
        form
    }
}

/// Values entered in a create/edit form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    values: BTreeMap<String, String>,
    // Fields that held a value when pre-filled; blanking one of them clears it
    prefilled: BTreeSet<String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: &str) {
        self.values.insert(field.to_string(), value.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.prefilled.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `key=value` assignments as given on the command line
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self, String> {
        let mut form = FormData::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (key, value) = assignment
                .split_once('=')
                .ok_or_else(|| format!("Expected key=value, got '{}'", assignment))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("Empty field name in '{}'", assignment));
            }
            form.set(key, value);
        }
        Ok(form)
    }

    /// Required fields that are missing or blank
    pub fn missing_required(&self, resource: Resource) -> Vec<&'static str> {
        resource
            .required_fields()
            .iter()
            .copied()
            .filter(|field| self.get(field).map_or(true, |v| v.trim().is_empty()))
            .collect()
    }

    /// JSON body for POST/PUT. Canonical numbers are sent as numbers.
    /// "0712" stays a string so phone numbers keep their zero. Blank values
    /// are left out, except a pre-filled field the user emptied, which is
    /// sent as null.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        for (key, value) in &self.values {
            let trimmed = value.trim();
            let json = if trimmed.is_empty() {
                if !self.prefilled.contains(key) {
                    continue;
                }
                Value::Null
            } else if let Some(n) = trimmed.parse::<i64>().ok().filter(|n| n.to_string() == trimmed) {
                Value::from(n)
            } else if let Some(n) = parse_decimal(trimmed) {
                Value::Number(n)
            } else {
                Value::String(value.clone())
            };
            body.insert(key.clone(), json);
        }
        Value::Object(body)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }
}

fn parse_decimal(s: &str) -> Option<serde_json::Number> {
    let (whole, frac) = s.split_once('.')?;
    let digits = whole.strip_prefix('-').unwrap_or(whole);
    if digits.is_empty() || frac.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    SchoolAdmin,
    Teacher,
    Student,
    Parent,
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "Super admin",
            Role::SchoolAdmin => "School admin",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
            Role::Parent => "Parent",
            Role::Other => "User",
        }
    }

    /// Collections shown in the navigation for this role
    pub fn resources(&self) -> Vec<Resource> {
        match self {
            Role::SuperAdmin | Role::SchoolAdmin | Role::Other => Resource::ALL.to_vec(),
            Role::Teacher => vec![
                Resource::Classes,
                Resource::Subjects,
                Resource::Students,
                Resource::Exams,
                Resource::Grades,
                Resource::Timetable,
                Resource::Attendance,
                Resource::Notices,
            ],
            Role::Student | Role::Parent => vec![
                Resource::Grades,
                Resource::Fees,
                Resource::Timetable,
                Resource::Notices,
                Resource::Documents,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub school_name: Option<String>,
}

fn default_role() -> Role {
    Role::Other
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_requires_integer_id() {
        assert!(Record::from_value(json!({"name": "7A"})).is_none());
        assert!(Record::from_value(json!({"id": "abc"})).is_none());
        assert!(Record::from_value(json!([1, 2])).is_none());

        let record = Record::from_value(json!({"id": "12", "name": "7A"})).unwrap();
        assert_eq!(record.id, 12);
        assert_eq!(record.text("name"), "7A");
        assert_eq!(record.text("id"), "12");
    }

    #[test]
    fn test_record_text_and_number() {
        let record = Record::from_value(json!({
            "id": 1,
            "amount": "1500.50",
            "amount_paid": 200,
            "active": true,
            "teacher_name": null
        }))
        .unwrap();

        assert_eq!(record.text("teacher_name"), "");
        assert_eq!(record.text("missing"), "");
        assert_eq!(record.text("active"), "true");
        assert_eq!(record.number("amount"), Some(1500.5));
        assert_eq!(record.number("amount_paid"), Some(200.0));
        assert_eq!(record.number("active"), None);
    }

    #[test]
    fn test_resource_parse() {
        assert_eq!(Resource::parse("Classes"), Some(Resource::Classes));
        assert_eq!(Resource::parse("student"), Some(Resource::Students));
        assert_eq!(Resource::parse("timetable"), Some(Resource::Timetable));
        assert_eq!(Resource::parse("class"), Some(Resource::Classes));
        assert_eq!(Resource::parse(" Class "), Some(Resource::Classes));
        for resource in Resource::ALL {
            assert_eq!(Resource::parse(resource.singular()), Some(resource));
        }
        assert_eq!(Resource::parse("library"), None);
    }

    #[test]
    fn test_form_assignments_and_required() {
        let form = FormData::from_assignments(&["name=Grade 7", "section= "]).unwrap();
        assert_eq!(form.get("name"), Some("Grade 7"));
        assert!(form.missing_required(Resource::Classes).is_empty());
        assert_eq!(form.missing_required(Resource::Subjects), vec!["code"]);

        assert!(FormData::from_assignments(&["nonsense"]).is_err());
        assert!(FormData::from_assignments(&["=x"]).is_err());
    }

    #[test]
    fn test_form_to_json() {
        let form = FormData::new()
            .with("name", "7A")
            .with("teacher", "4")
            .with("fee", "12.5")
            .with("section", "")
            .with("phone", "0712345678");
        assert_eq!(
            form.to_json(),
            json!({"name": "7A", "teacher": 4, "fee": 12.5, "phone": "0712345678"})
        );
    }

    #[test]
    fn test_edit_form_only_carries_known_fields() {
        let record = Record::from_value(json!({
            "id": 1,
            "first_name": "Ann",
            "last_name": "Lee",
            "admission_number": "A-1",
            "email": "ann@school.test",
            "class_id": null
        }))
        .unwrap();

        let mut form = record.to_form(Resource::Students);
        assert_eq!(form.get("first_name"), Some("Ann"));
        assert_eq!(form.get("class_id"), None);
        assert_eq!(form.get("date_of_birth"), None);

        form.set("email", "");
        form.set("date_of_birth", " ");
        assert_eq!(
            form.to_json(),
            json!({"first_name": "Ann", "last_name": "Lee", "admission_number": "A-1", "email": null})
        );
    }

    #[test]
    fn test_user_unknown_role() {
        let user: User = serde_json::from_value(json!({
            "id": 3,
            "username": "kim",
            "role": "librarian"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Other);
        assert_eq!(user.email, None);
    }
}
