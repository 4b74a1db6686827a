/// The listener surface (spec §6): TCP port and/or a Unix-domain socket
/// path (must be ≤107 bytes to fit `sockaddr_un`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListenerConfig {
    pub port: Option<u16>,
    pub socketfile: Option<String>,
}

impl ListenerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.socketfile {
            if path.len() > 107 {
                return Err(format!(
                    "socketfile path {:?} is {} bytes, exceeding the 107-byte sockaddr_un limit",
                    path,
                    path.len()
                ));
            }
        }
        if self.port.is_none() && self.socketfile.is_none() {
            return Err("neither `port` nor `socketfile` was configured".to_string());
        }
        Ok(())
    }
}
