//! 导出器共用的小工具

/// 保留两位小数输出
pub(crate) fn num(v: f64) -> String {
    // 加 0.0 消除 -0
    let r = (v * 100.0).round() / 100.0 + 0.0;
    format!("{}", r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(2.777), "2.78");
        assert_eq!(num(-0.001), "0");
        assert_eq!(num(-3.5), "-3.5");
    }
}
