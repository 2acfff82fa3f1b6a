use serde::{Deserialize, Serialize};

/// 一个订阅主题：对应一次 arXiv 检索和一份日报
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// 日报中显示的名称
    pub name: String,
    /// arXiv 检索语句，例如 `cat:cs.AI OR cat:cs.CL`
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Topic {
    fn default() -> Self {
        Self {
            name: "计算机科学".to_string(),
            query: "cat:cs.AI OR cat:cs.CL OR cat:cs.LG".to_string(),
            description: None,
        }
    }
}

/// TOML 文件的顶层结构
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicFile {
    #[serde(default)]
    pub topics: Vec<Topic>,
}
