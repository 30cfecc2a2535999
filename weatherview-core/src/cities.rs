use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

const CITY_NAMES: &[(&str, &str)] = &[
    ("Beijing", "北京"),
    ("Shanghai", "上海"),
    ("Guangzhou", "广州"),
    ("Shenzhen", "深圳"),
    ("Hangzhou", "杭州"),
    ("Nanjing", "南京"),
    ("Wuhan", "武汉"),
    ("Chengdu", "成都"),
    ("Xi'an", "西安"),
    ("Chongqing", "重庆"),
    ("Tianjin", "天津"),
    ("Shenyang", "沈阳"),
    ("Dalian", "大连"),
    ("Qingdao", "青岛"),
    ("Jinan", "济南"),
    ("Harbin", "哈尔滨"),
    ("Changchun", "长春"),
    ("Kunming", "昆明"),
    ("Xiamen", "厦门"),
    ("Fuzhou", "福州"),
    ("Hefei", "合肥"),
    ("Nanchang", "南昌"),
    ("Changsha", "长沙"),
    ("Zhengzhou", "郑州"),
    ("Taiyuan", "太原"),
    ("Shijiazhuang", "石家庄"),
    ("Hohhot", "呼和浩特"),
    ("Urumqi", "乌鲁木齐"),
    ("Lhasa", "拉萨"),
    ("Yinchuan", "银川"),
    ("Xining", "西宁"),
    ("Lanzhou", "兰州"),
    ("Guiyang", "贵阳"),
    ("Nanning", "南宁"),
    ("Haikou", "海口"),
    ("Sanya", "三亚"),
    ("New York", "纽约"),
    ("London", "伦敦"),
    ("Paris", "巴黎"),
    ("Tokyo", "东京"),
    ("Seoul", "首尔"),
    ("Singapore", "新加坡"),
    ("Sydney", "悉尼"),
    ("Melbourne", "墨尔本"),
    ("Toronto", "多伦多"),
    ("Vancouver", "温哥华"),
    ("Los Angeles", "洛杉矶"),
    ("San Francisco", "旧金山"),
    ("Chicago", "芝加哥"),
    ("Washington", "华盛顿"),
    ("Moscow", "莫斯科"),
    ("Berlin", "柏林"),
    ("Rome", "罗马"),
    ("Madrid", "马德里"),
    ("Amsterdam", "阿姆斯特丹"),
    ("Bangkok", "曼谷"),
    ("Mumbai", "孟买"),
    ("Dubai", "迪拜"),
];

/// Localized display name for an English city name; unknown names pass through.
pub fn translate_city_name(english: &str) -> String {
    CITY_NAMES
        .iter()
        .find(|(en, _)| *en == english)
        .map(|(_, local)| (*local).to_string())
        .unwrap_or_else(|| english.to_string())
}

#[derive(Debug, Deserialize)]
struct CityCodeEntry {
    #[serde(default)]
    city_name: String,
    #[serde(default)]
    city_code: String,
}

/// Name → provider city id lookup, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct CityCodeTable {
    codes: HashMap<String, String>,
}

impl CityCodeTable {
    /// Parse a JSON array of `{"city_name": ..., "city_code": ...}` objects.
    /// Entries with an empty name or code are skipped.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CityCodeEntry> =
            serde_json::from_str(json).context("Failed to parse city code table")?;

        let codes = entries
            .into_iter()
            .filter(|e| !e.city_name.is_empty() && !e.city_code.is_empty())
            .map(|e| (e.city_name, e.city_code))
            .collect();

        Ok(Self { codes })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read city code table: {}", path.display()))?;
        let table = Self::from_json(&contents)?;
        tracing::info!("Loaded {} cities from {}", table.len(), path.display());
        Ok(table)
    }

    /// Like [`CityCodeTable::load`], but a missing or unreadable file yields an empty table.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match Self::load(path) {
            Ok(table) => table,
            Err(e) => {
                tracing::warn!("Couldn't load city codes: {e:#}");
                Self::default()
            }
        }
    }

    pub fn code(&self, city_name: &str) -> Option<&str> {
        self.codes.get(city_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn known_names_are_translated() {
        assert_eq!(translate_city_name("Beijing"), "北京");
        assert_eq!(translate_city_name("Xi'an"), "西安");
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(translate_city_name("Reykjavik"), "Reykjavik");
    }

    #[test]
    fn table_skips_incomplete_entries() {
        let table = CityCodeTable::from_json(
            r#"[
                {"city_name": "北京", "city_code": "101010100"},
                {"city_name": "", "city_code": "1"},
                {"city_name": "上海"}
            ]"#,
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.code("北京"), Some("101010100"));
        assert_eq!(table.code("上海"), None);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"city_name": "London", "city_code": "2643743"}}]"#).unwrap();

        let table = CityCodeTable::load(file.path()).unwrap();
        assert_eq!(table.code("London"), Some("2643743"));
    }

    #[test]
    fn missing_file_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = CityCodeTable::load_or_empty(Some(&dir.path().join("nope.json")));
        assert!(table.is_empty());
        assert!(CityCodeTable::load_or_empty(None).is_empty());
    }
}
