use serde::Serialize;

/// Target connector families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectorKind {
    FileSystem,
    Ftp,
    Sftp,
    Http,
    Soap,
    ServiceBus,
    Sql,
    Oracle,
    Db2,
    Sap,
    IbmMq,
    Smtp,
    Pop3,
    As2,
    EventHub,
    Cics,
    Ims,
    HostFile,
    Generic,
}
