use anyhow::Result;

use crate::platform;
use crate::runtime::Runtime;

/// Print the target triple of the running process
#[tracing::instrument(skip(runtime))]
pub fn detect<R: Runtime>(runtime: R) -> Result<()> {
    let triple = platform::detect(&runtime)?;
    println!("{}", triple);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DistError, dist_error};
    use crate::platform::BACKEND_ENV;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    #[test]
    fn test_detect_unsupported_platform() {
        let mut runtime = MockRuntime::new();
        runtime.expect_arch().returning(|| "riscv64".into());
        runtime.expect_os().returning(|| "linux".into());
        runtime
            .expect_env_var()
            .with(eq(BACKEND_ENV))
            .returning(|_| Err(std::env::VarError::NotPresent));
        runtime.expect_exists().returning(|_| false);

        let err = detect(runtime).unwrap_err();
        assert_eq!(dist_error(&err).map(DistError::stage), Some("detection"));
    }
}
