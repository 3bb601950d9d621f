//! 随机密钥生成

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;

const SECRET_BYTES: usize = 32;

fn random_bytes() -> [u8; SECRET_BYTES] {
    let mut buf = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// oauth2-proxy cookie secret：32 字节随机数的 base64
pub fn generate_cookie_secret() -> String {
    STANDARD.encode(random_bytes())
}

/// 设置令牌：32 字节随机数的十六进制（64 字符）
pub fn generate_setup_token() -> String {
    random_bytes().iter().map(|b| format!("{:02x}", b)).collect()
}
