#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    TsParse,
    TsRebuild,
    TsWrite,
    TsValidate,
    TsStats,
    TsTranslate,
    TsUpdate,
    TsPretranslate,
    TmHarvest,
    DetectEncoding,
    Unknown,
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "ping" => Command::Ping,
            "ts.parse" => Command::TsParse,
            "ts.rebuild" => Command::TsRebuild,
            "ts.write" => Command::TsWrite,
            "ts.validate" => Command::TsValidate,
            "ts.stats" => Command::TsStats,
            "ts.translate" => Command::TsTranslate,
            "ts.update" => Command::TsUpdate,
            "ts.pretranslate" => Command::TsPretranslate,
            "tm.harvest" => Command::TmHarvest,
            "encoding.detect" | "detect_encoding" => Command::DetectEncoding,
            _ => Command::Unknown,
        }
    }
}
