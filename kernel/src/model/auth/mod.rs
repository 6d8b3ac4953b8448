// 認証サブシステムが発行したアクセストークン
#[derive(Debug, Clone)]
pub struct AccessToken(pub String);
