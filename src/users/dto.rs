use serde::Deserialize;

/// Form posted from the admin console; one submission per transition. Fields
/// not used by the selected action arrive empty.
#[derive(Debug, Deserialize)]
pub struct AdminForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub newpwd: String,
}
