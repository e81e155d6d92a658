use serialport::{SerialPortInfo, SerialPortType};

pub fn run() {
    let mut ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            eprintln!("Error listing ports: {e}");
            std::process::exit(1);
        }
    };
    ports.sort_by(|a, b| a.port_name.cmp(&b.port_name));

    if ports.is_empty() {
        println!("No serial ports found.");
        return;
    }

    println!("Found {} serial port(s):\n", ports.len());
    for port in &ports {
        println!("  {:<25} {}", port.port_name, describe(port));
    }
    println!("\nMonitor one with: potscope monitor --port <PORT>");
}

/// Human-readable kind of a serial port.
fn describe(port: &SerialPortInfo) -> String {
    match &port.port_type {
        SerialPortType::UsbPort(info) => {
            let parts: Vec<&str> = [info.manufacturer.as_deref(), info.product.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            let ids = format!("{:04x}:{:04x}", info.vid, info.pid);
            if parts.is_empty() {
                format!("USB serial ({ids})")
            } else {
                format!("{} ({ids})", parts.join(" "))
            }
        }
        SerialPortType::BluetoothPort => "Bluetooth".into(),
        SerialPortType::PciPort => "PCI".into(),
        SerialPortType::Unknown => "unknown".into(),
    }
}
