use serde::{Deserialize, Serialize};

use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    pub enum Role {
        Admin => "admin",
        Supervisor => "supervisor",
        Viewer => "viewer",
    }
}
