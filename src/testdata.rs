pub(crate) const CA_CERT: &[u8] = include_bytes!("../testdata/ca.pem");
pub(crate) const OTHER_CA_CERT: &[u8] = include_bytes!("../testdata/other_ca.pem");
pub(crate) const CLIENT_CERT: &[u8] = include_bytes!("../testdata/client.pem");
pub(crate) const CLIENT_KEY: &[u8] = include_bytes!("../testdata/client.key");
pub(crate) const SERVER_KEY: &[u8] = include_bytes!("../testdata/server.key");
