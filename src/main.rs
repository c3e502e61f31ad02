fn main() {
    flubsim::start();
}
