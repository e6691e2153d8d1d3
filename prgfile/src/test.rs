use super::*;

#[test]
fn write_read() {
    let path = "test.prg";

    let bytes = vec![0xA9, 0x41, 0x8D, 0x20, 0xD0, 0x60];

    let program_orig = Program::from(0x0801, bytes);

    write_file(path, &program_orig).unwrap();

    let program_read = read_file(path).unwrap();

    assert_eq!(program_orig, program_read);

    std::fs::remove_file(path).unwrap();
}

#[test]
fn file_image_prefix() {
    let program = Program::from(0xC000, vec![0x60]);
    assert_eq!(program.to_bytes(), vec![0x00, 0xC0, 0x60]);
}

#[test]
fn stub_targets_first_instruction() {
    let (stub, target) = basic_stub();

    // The stub occupies $0801..target, so the SYS digits must spell target.
    assert_eq!(target as usize, 0x0801 + stub.len());
    assert_eq!(stub[4], 0x9E);

    let digits: Vec<u8> = target.to_string().bytes().collect();
    assert_eq!(&stub[5..5 + digits.len()], &digits[..]);

    // $0801 + 12 bytes of stub = 2061
    assert_eq!(target, 2061);
    assert_eq!(stub.len(), 12);
}
