use serde::{Deserialize, Serialize};

/// OCR 校验时需要出现在图片上的文字
///
/// 空字符串与缺省等价。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub venue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
}

/// 未在识别文字中找到的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissingField {
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "lieu")]
    Venue,
    #[serde(rename = "heure")]
    Time,
    #[serde(rename = "prix")]
    Price,
    #[serde(rename = "cta")]
    Cta,
}

impl MissingField {
    pub fn as_str(self) -> &'static str {
        match self {
            MissingField::Date => "date",
            MissingField::Venue => "lieu",
            MissingField::Time => "heure",
            MissingField::Price => "prix",
            MissingField::Cta => "cta",
        }
    }
}

/// 单张图片的校验状态
///
/// `Idle`/`Checking` 只能单向变为 `Ok`/`Bad`/`Error`，终态不再改变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationStatus {
    Idle,
    Checking,
    Ok {
        text: String,
        missing: Vec<MissingField>,
    },
    Bad {
        text: String,
        missing: Vec<MissingField>,
    },
    Error {
        error: String,
    },
}

impl VerificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Ok { .. }
                | VerificationStatus::Bad { .. }
                | VerificationStatus::Error { .. }
        )
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationStatus::Ok { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, VerificationStatus::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_shape() {
        let status = VerificationStatus::Bad {
            text: "SAMEDI".to_string(),
            missing: vec![MissingField::Venue, MissingField::Price],
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "bad");
        assert_eq!(json["missing"][0], "lieu");
        assert_eq!(json["missing"][1], "prix");

        let idle = serde_json::to_value(VerificationStatus::Idle).unwrap();
        assert_eq!(idle, serde_json::json!({ "status": "idle" }));
    }

    #[test]
    fn test_expected_fields_accepts_partial_payload() {
        let expected: ExpectedFields =
            serde_json::from_str(r#"{"date":"Samedi 28 mars","venue":"Warehouse 13"}"#).unwrap();
        assert_eq!(expected.date, "Samedi 28 mars");
        assert!(expected.time.is_none());
    }
}
